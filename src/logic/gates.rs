//! Boolean gates built from signal nodes.
//!
//! Two-input gates over two constants fold to a constant; every other gate
//! allocates a fresh node subscribed to its operands. The inverter always
//! allocates a node.

use crate::signal::{Circuit, Combinator, Readable, ReadableBus, Signal};

/// Logical negation of `input`.
pub fn not(c: &Circuit, input: impl Readable) -> Signal {
    let out = c.node(false);
    c.link_inverted(out, input);
    Signal::Node(out)
}

fn combine(c: &Circuit, a: Signal, b: Signal, op: Combinator) -> Signal {
    match (a, b) {
        (Signal::Constant(a), Signal::Constant(b)) => Signal::Constant(op.apply(a, b)),
        _ => {
            let out = c.node(false);
            c.combine(out, a, b, op);
            Signal::Node(out)
        }
    }
}

pub fn and(c: &Circuit, a: impl Readable, b: impl Readable) -> Signal {
    combine(c, a.signal(), b.signal(), Combinator::And)
}

pub fn or(c: &Circuit, a: impl Readable, b: impl Readable) -> Signal {
    combine(c, a.signal(), b.signal(), Combinator::Or)
}

pub fn nand(c: &Circuit, a: impl Readable, b: impl Readable) -> Signal {
    let both = and(c, a, b);
    not(c, both)
}

pub fn nor(c: &Circuit, a: impl Readable, b: impl Readable) -> Signal {
    let either = or(c, a, b);
    not(c, either)
}

/// `(a OR b) AND (a NAND b)`.
pub fn xor(c: &Circuit, a: impl Readable, b: impl Readable) -> Signal {
    let (a, b) = (a.signal(), b.signal());
    let either = or(c, a, b);
    let not_both = nand(c, a, b);
    and(c, either, not_both)
}

// ==================== Multi-input forms ====================

/// Left-to-right reduction; an empty input yields `identity`.
fn reduce<B: ReadableBus + ?Sized>(c: &Circuit, inputs: &B, identity: bool, op: Combinator) -> Signal {
    let mut signals = inputs.signals().into_iter();
    match signals.next() {
        None => Signal::Constant(identity),
        Some(first) => signals.fold(first, |acc, next| combine(c, acc, next, op)),
    }
}

pub fn multi_and<B: ReadableBus + ?Sized>(c: &Circuit, inputs: &B) -> Signal {
    reduce(c, inputs, true, Combinator::And)
}

pub fn multi_or<B: ReadableBus + ?Sized>(c: &Circuit, inputs: &B) -> Signal {
    reduce(c, inputs, false, Combinator::Or)
}

pub fn multi_nand<B: ReadableBus + ?Sized>(c: &Circuit, inputs: &B) -> Signal {
    let all = multi_and(c, inputs);
    not(c, all)
}

pub fn multi_nor<B: ReadableBus + ?Sized>(c: &Circuit, inputs: &B) -> Signal {
    let any = multi_or(c, inputs);
    not(c, any)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truth_table(gate: fn(&Circuit, Signal, Signal) -> Signal) -> [bool; 4] {
        let c = Circuit::new();
        let a = c.node(false);
        let b = c.node(false);
        let out = gate(&c, a.into(), b.into());
        let mut table = [false; 4];
        for (i, entry) in table.iter_mut().enumerate() {
            c.write(a, i & 1 == 1);
            c.write(b, i & 2 == 2);
            *entry = c.read(out);
        }
        table
    }

    #[test]
    fn test_truth_tables() {
        // Inputs (a, b) in order: 00, 10, 01, 11
        assert_eq!(truth_table(|c, a, b| and(c, a, b)), [false, false, false, true]);
        assert_eq!(truth_table(|c, a, b| or(c, a, b)), [false, true, true, true]);
        assert_eq!(truth_table(|c, a, b| nand(c, a, b)), [true, true, true, false]);
        assert_eq!(truth_table(|c, a, b| nor(c, a, b)), [true, false, false, false]);
        assert_eq!(truth_table(|c, a, b| xor(c, a, b)), [false, true, true, false]);
    }

    #[test]
    fn test_not_tracks_input() {
        let c = Circuit::new();
        let a = c.node(false);
        let out = not(&c, a);
        assert!(c.read(out));
        c.write(a, true);
        assert!(!c.read(out));
    }

    #[test]
    fn test_not_of_constant_is_live() {
        let c = Circuit::new();
        let out = not(&c, Signal::TRUE);
        assert!(!out.is_constant());
        assert!(!c.read(out));
    }

    #[test]
    fn test_constant_folding() {
        let c = Circuit::new();
        let before = c.node_count();
        assert_eq!(and(&c, true, true), Signal::TRUE);
        assert_eq!(or(&c, false, false), Signal::FALSE);
        assert_eq!(c.node_count(), before);

        let a = c.node(true);
        let mixed = and(&c, a, Signal::TRUE);
        assert!(!mixed.is_constant());
        assert!(c.read(mixed));
    }

    #[test]
    fn test_multi_gates() {
        let c = Circuit::new();
        let inputs = c.bus(4, 0).unwrap();
        let all = multi_and(&c, &inputs);
        let any = multi_or(&c, &inputs);
        let none = multi_nor(&c, &inputs);
        let not_all = multi_nand(&c, &inputs);
        for value in 0..16 {
            c.write_bus(&inputs, value).unwrap();
            assert_eq!(c.read(all), value == 15, "and {value}");
            assert_eq!(c.read(any), value != 0, "or {value}");
            assert_eq!(c.read(none), value == 0, "nor {value}");
            assert_eq!(c.read(not_all), value != 15, "nand {value}");
        }
    }

    #[test]
    fn test_single_and_empty_inputs() {
        let c = Circuit::new();
        let a = c.node(true);
        assert_eq!(multi_or(&c, &[a]), Signal::Node(a));
        let empty: [Signal; 0] = [];
        assert_eq!(multi_and(&c, &empty), Signal::TRUE);
        assert_eq!(multi_or(&c, &empty), Signal::FALSE);
    }
}
