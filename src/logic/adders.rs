//! Binary adders and the add/subtract unit.

use crate::signal::{Circuit, NodeId, Readable, ReadableBus, Signal};

use super::gates::{and, or, xor};

/// Sum and carry of two bits.
#[derive(Debug, Clone, Copy)]
pub struct HalfAdder {
    pub sum: Signal,
    pub carry: Signal,
}

impl HalfAdder {
    pub fn new(c: &Circuit, a: impl Readable, b: impl Readable) -> Self {
        let (a, b) = (a.signal(), b.signal());
        let sum = xor(c, a, b);
        let carry = and(c, a, b);
        Self { sum, carry }
    }
}

impl Readable for HalfAdder {
    fn signal(&self) -> Signal {
        self.sum
    }
}

/// Sum and carry of two bits plus a carry-in.
#[derive(Debug, Clone, Copy)]
pub struct FullAdder {
    sum: NodeId,
    pub carry: Signal,
}

impl FullAdder {
    pub fn new(c: &Circuit, carry_in: impl Readable, a: impl Readable, b: impl Readable) -> Self {
        let sum = c.node(false);
        let low = HalfAdder::new(c, a, b);
        let high = HalfAdder::new(c, carry_in, low.sum);
        c.link(sum, high.sum);
        let carry = or(c, low.carry, high.carry);
        Self { sum, carry }
    }

    pub fn sum(&self) -> Signal {
        Signal::Node(self.sum)
    }
}

impl Readable for FullAdder {
    fn signal(&self) -> Signal {
        self.sum()
    }
}

/// Ripple-carry adder over two buses of equal width.
///
/// The output width is the narrower of the two inputs.
#[derive(Debug, Clone)]
pub struct MultiAdder {
    sum: Vec<NodeId>,
    pub carry: Signal,
}

impl MultiAdder {
    pub fn new<A, B>(c: &Circuit, carry_in: impl Readable, a: &A, b: &B) -> Self
    where
        A: ReadableBus + ?Sized,
        B: ReadableBus + ?Sized,
    {
        let (a, b) = (a.signals(), b.signals());
        let width = a.len().min(b.len());
        let sum: Vec<NodeId> = (0..width).map(|_| c.node(false)).collect();

        let mut carry = carry_in.signal();
        let mut stages = Vec::with_capacity(width);
        for (&a, &b) in a.iter().zip(&b) {
            let stage = FullAdder::new(c, carry, a, b);
            carry = stage.carry;
            stages.push(stage);
        }
        c.link_bus(&sum, &stages);

        Self { sum, carry }
    }
}

impl ReadableBus for MultiAdder {
    fn signals(&self) -> Vec<Signal> {
        self.sum.signals()
    }

    fn width(&self) -> usize {
        self.sum.len()
    }
}

/// Invert every bit of `input` while `invert` is high.
pub fn ones_complement<B>(c: &Circuit, invert: impl Readable, input: &B) -> Vec<Signal>
where
    B: ReadableBus + ?Sized,
{
    let invert = invert.signal();
    input.signals().into_iter().map(|bit| xor(c, invert, bit)).collect()
}

/// `a + b` or, while `subtract` is high, `a - b` in two's complement.
///
/// `overflow` is the carry-out in add mode and the borrow in subtract mode.
#[derive(Debug, Clone)]
pub struct AddSubtract {
    sum: Vec<NodeId>,
    pub overflow: Signal,
}

impl AddSubtract {
    pub fn new<A, B>(c: &Circuit, subtract: impl Readable, a: &A, b: &B) -> Self
    where
        A: ReadableBus + ?Sized,
        B: ReadableBus + ?Sized,
    {
        let subtract = subtract.signal();
        let sum: Vec<NodeId> = (0..a.width().min(b.width())).map(|_| c.node(false)).collect();
        let operand = ones_complement(c, subtract, b);
        let adder = MultiAdder::new(c, subtract, a, &operand);
        c.link_bus(&sum, &adder);
        let overflow = xor(c, subtract, adder.carry);
        Self { sum, overflow }
    }
}

impl ReadableBus for AddSubtract {
    fn signals(&self) -> Vec<Signal> {
        self.sum.signals()
    }

    fn width(&self) -> usize {
        self.sum.len()
    }
}
