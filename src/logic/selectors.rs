//! Selectors and one-hot decoders.

use crate::signal::{Circuit, Readable, ReadableBus, Signal};

use super::gates::{and, multi_and, multi_or, not, or};

/// `a` while `select` is false, `b` while it is true.
pub fn selector(c: &Circuit, select: impl Readable, a: impl Readable, b: impl Readable) -> Signal {
    let select = select.signal();
    let take_b = and(c, select, b);
    let not_select = not(c, select);
    let take_a = and(c, not_select, a);
    or(c, take_b, take_a)
}

/// Gate each `data[i]` with the minterm of `select` that equals `i`.
fn gated_lines(c: &Circuit, select: &[Signal], data: &[Signal]) -> Vec<Signal> {
    data.iter()
        .enumerate()
        .map(|(i, &line)| {
            let minterm: Vec<Signal> = select
                .iter()
                .enumerate()
                .map(|(j, &s)| if (i >> j) & 1 == 0 { not(c, s) } else { s })
                .collect();
            let matched = multi_and(c, &minterm);
            and(c, line, matched)
        })
        .collect()
}

/// `2^n`-way selection: the output follows `data[select]`.
pub fn multi_selector<S, D>(c: &Circuit, select: &S, data: &D) -> Signal
where
    S: ReadableBus + ?Sized,
    D: ReadableBus + ?Sized,
{
    let lines = gated_lines(c, &select.signals(), &data.signals());
    multi_or(c, &lines)
}

/// One-hot decode: line `select` follows `data`, every other line is low.
pub fn multi_decoder<S>(c: &Circuit, select: &S, data: impl Readable) -> Vec<Signal>
where
    S: ReadableBus + ?Sized,
{
    let select = select.signals();
    let data = vec![data.signal(); 1 << select.len()];
    gated_lines(c, &select, &data)
}

/// A decoder per data bit: `result[bit][line]`.
pub fn multi_decoder_bus<S, D>(c: &Circuit, select: &S, data: &D) -> Vec<Vec<Signal>>
where
    S: ReadableBus + ?Sized,
    D: ReadableBus + ?Sized,
{
    data.signals()
        .into_iter()
        .map(|bit| multi_decoder(c, select, bit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector() {
        let c = Circuit::new();
        let select = c.node(false);
        let a = c.node(true);
        let b = c.node(false);
        let out = selector(&c, select, a, b);
        assert!(c.read(out));
        c.write(select, true);
        assert!(!c.read(out));
        c.write(b, true);
        assert!(c.read(out));
        c.write(a, false);
        assert!(c.read(out));
        c.write(select, false);
        assert!(!c.read(out));
    }

    #[test]
    fn test_multi_selector() {
        let c = Circuit::new();
        let select = c.bus(3, 0).unwrap();
        let data = c.bus(8, 0b1010_0110).unwrap();
        let out = multi_selector(&c, &select, &data);
        for i in 0..8 {
            c.write_bus(&select, i).unwrap();
            assert_eq!(c.read(out), (0b1010_0110 >> i) & 1 == 1, "line {i}");
        }
    }

    #[test]
    fn test_multi_decoder_is_one_hot() {
        let c = Circuit::new();
        let select = c.bus(2, 0).unwrap();
        let data = c.node(true);
        let lines = multi_decoder(&c, &select, data);
        assert_eq!(lines.len(), 4);
        for i in 0..4u64 {
            c.write_bus(&select, i).unwrap();
            assert_eq!(c.read_bus(&lines), 1 << i);
        }
        c.write(data, false);
        assert_eq!(c.read_bus(&lines), 0);
    }

    #[test]
    fn test_multi_decoder_bus() {
        let c = Circuit::new();
        let select = c.bus(1, 1).unwrap();
        let data = c.bus(2, 0b10).unwrap();
        let decoded = multi_decoder_bus(&c, &select, &data);
        assert_eq!(decoded.len(), 2);
        assert_eq!(c.read_bus(&decoded[0]), 0);
        assert_eq!(c.read_bus(&decoded[1]), 0b10);
    }
}
