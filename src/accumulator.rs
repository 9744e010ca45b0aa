//! Running-total adders.

use crate::logic::MultiAdder;
use crate::ram::{ControlPanelRam, RamDriver};
use crate::sequential::{MultiEdgeLatch, MultiLatchConfig, RippleCounter};
use crate::signal::{Circuit, NodeId, Readable, ReadableBus, Signal};

/// Adds `input` to its output on every rising edge of `add`.
#[derive(Debug, Clone)]
pub struct Accumulator {
    out: Vec<NodeId>,
}

impl Accumulator {
    pub fn new<B>(c: &Circuit, input: &B, add: impl Readable, clear: impl Readable) -> Self
    where
        B: ReadableBus + ?Sized,
    {
        let out: Vec<NodeId> = (0..input.width()).map(|_| c.node(false)).collect();
        let sum = MultiAdder::new(c, Signal::FALSE, input, &out);
        let latch = MultiEdgeLatch::new(c, add, &sum, MultiLatchConfig::default().with_clear(clear));
        c.link_bus(&out, &latch);
        Self { out }
    }
}

impl ReadableBus for Accumulator {
    fn signals(&self) -> Vec<Signal> {
        self.out.signals()
    }

    fn width(&self) -> usize {
        self.out.len()
    }
}

/// Sums consecutive memory words, one per clock pulse.
///
/// A ripple counter walks the addresses of a console-override RAM whose
/// primary driver never writes; the console lines load the values to sum.
#[derive(Debug, Clone)]
pub struct RamAccumulator {
    total: Accumulator,
}

impl RamAccumulator {
    pub fn new(
        c: &Circuit,
        clock: impl Readable,
        console: &RamDriver,
        clear: impl Readable,
        takeover: impl Readable,
    ) -> Self {
        let (clock, clear) = (clock.signal(), clear.signal());
        let counter = RippleCounter::new(c, console.address.len(), clock, clear, 0);
        let idle = vec![Signal::FALSE; console.data.len()];
        let primary = RamDriver::new(&counter, &idle, Signal::FALSE);
        let ram = ControlPanelRam::new(c, &primary, takeover, console);
        let total = Accumulator::new(c, &ram, clock, clear);
        Self { total }
    }
}

impl ReadableBus for RamAccumulator {
    fn signals(&self) -> Vec<Signal> {
        self.total.signals()
    }

    fn width(&self) -> usize {
        self.total.width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::Oscillator;

    const A: u64 = 27;
    const B: u64 = 16;
    const C: u64 = 62;

    fn pulse(c: &Circuit, node: NodeId) {
        c.write(node, true);
        c.write(node, false);
    }

    #[test]
    fn test_accumulator() {
        let c = Circuit::new();
        let input = c.bus(8, 0).unwrap();
        let add = c.node(false);
        let clear = c.node(false);
        let accumulator = Accumulator::new(&c, &input, add, clear);
        assert_eq!(c.read_bus(&accumulator), 0, "accumulator 1");

        c.write_bus(&input, A).unwrap();
        assert_eq!(c.read_bus(&accumulator), 0, "accumulator 2");
        pulse(&c, add);
        assert_eq!(c.read_bus(&accumulator), A, "accumulator 3");
        c.write_bus(&input, B).unwrap();
        assert_eq!(c.read_bus(&accumulator), A, "accumulator 4");
        pulse(&c, add);
        assert_eq!(c.read_bus(&accumulator), A + B, "accumulator 5");
        c.write_bus(&input, C).unwrap();
        pulse(&c, add);
        assert_eq!(c.read_bus(&accumulator), A + B + C, "accumulator 6");
        pulse(&c, add);
        assert_eq!(c.read_bus(&accumulator), A + B + C + C, "accumulator 7");
        pulse(&c, clear);
        assert_eq!(c.read_bus(&accumulator), 0, "accumulator 8");
    }

    #[test]
    fn test_ram_accumulator() {
        let c = Circuit::new();
        let oscillator = Oscillator::new(&c, false);
        let address = c.bus(4, 0).unwrap();
        let data = c.bus(8, 0).unwrap();
        let write = c.node(false);
        let clear = c.node(false);
        let takeover = c.node(false);
        let console = RamDriver::new(&address, &data, write);
        let accumulator = RamAccumulator::new(&c, &oscillator, &console, clear, takeover);
        assert_eq!(c.read_bus(&accumulator), 0, "ram accumulator 1");

        c.write(takeover, true);
        for (at, value) in [(0, A), (1, B), (2, C)] {
            c.write_bus(&address, at).unwrap();
            c.write_bus(&data, value).unwrap();
            pulse(&c, write);
        }
        c.write(takeover, false);
        assert_eq!(c.read_bus(&accumulator), 0, "ram accumulator 2");

        for expected in [A, A + B, A + B + C] {
            oscillator.run(&c, 2, |_, _| {});
            assert_eq!(c.read_bus(&accumulator), expected);
        }
        pulse(&c, clear);
        assert_eq!(c.read_bus(&accumulator), 0, "ram accumulator 6");
    }
}
