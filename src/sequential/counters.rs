//! Counters built from edge latches.

use crate::logic::{and, not, or};
use crate::signal::{bits, Circuit, NodeId, Readable, ReadableBus, Signal};

use super::latches::{EdgeLatch, Invertible, LatchConfig};

/// Toggles its output on every rising edge of `clock`.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyDivider {
    q: NodeId,
    bar: NodeId,
}

impl FrequencyDivider {
    pub fn new(c: &Circuit, clock: impl Readable, config: LatchConfig) -> Self {
        let q = c.node(config.state);
        let bar = c.node(!config.state);
        let latch = EdgeLatch::new(c, clock, bar, config);
        c.link(q, latch);
        c.link(bar, latch.bar());
        Self { q, bar }
    }
}

impl Readable for FrequencyDivider {
    fn signal(&self) -> Signal {
        Signal::Node(self.q)
    }
}

impl Invertible for FrequencyDivider {
    fn bar(&self) -> Signal {
        Signal::Node(self.bar)
    }
}

/// Chain of frequency dividers counting completed clock pulses.
///
/// Bit 0 toggles on each falling edge of `clock`; bit `i` toggles when bit
/// `i - 1` falls. The count wraps silently.
#[derive(Debug, Clone)]
pub struct RippleCounter {
    bits: Vec<FrequencyDivider>,
}

impl RippleCounter {
    pub fn new(c: &Circuit, width: usize, clock: impl Readable, clear: impl Readable, state: u64) -> Self {
        let clock = clock.signal();
        let clear = clear.signal();
        let mut bits: Vec<FrequencyDivider> = Vec::with_capacity(width);
        for i in 0..width {
            let bit_clock = match bits.last() {
                None => not(c, clock),
                Some(previous) => previous.bar(),
            };
            let config = LatchConfig::default()
                .with_clear(clear)
                .with_state(bits::nth_bit(state, i));
            bits.push(FrequencyDivider::new(c, bit_clock, config));
        }
        Self { bits }
    }
}

impl ReadableBus for RippleCounter {
    fn signals(&self) -> Vec<Signal> {
        self.bits.signals()
    }

    fn width(&self) -> usize {
        self.bits.len()
    }
}

/// Ripple counter that can be loaded from `address`.
///
/// While `set` is high every bit is forced to the matching `address` bit;
/// `reset` clears the counter and overrides `set`.
#[derive(Debug, Clone)]
pub struct AddressCounter {
    bits: Vec<FrequencyDivider>,
}

impl AddressCounter {
    pub fn new<B>(
        c: &Circuit,
        clock: impl Readable,
        address: &B,
        set: impl Readable,
        reset: impl Readable,
        state: u64,
    ) -> Self
    where
        B: ReadableBus + ?Sized,
    {
        let clock = clock.signal();
        let (set, reset) = (set.signal(), reset.signal());
        let mut bits: Vec<FrequencyDivider> = Vec::new();
        for (i, target) in address.signals().into_iter().enumerate() {
            let bit_clock = match bits.last() {
                None => not(c, clock),
                Some(previous) => previous.bar(),
            };
            let not_target = not(c, target);
            let load_low = and(c, set, not_target);
            let clear = or(c, load_low, reset);
            let preset = and(c, set, target);
            let config = LatchConfig {
                clear,
                preset,
                state: bits::nth_bit(state, i),
            };
            bits.push(FrequencyDivider::new(c, bit_clock, config));
        }
        Self { bits }
    }
}

impl ReadableBus for AddressCounter {
    fn signals(&self) -> Vec<Signal> {
        self.bits.signals()
    }

    fn width(&self) -> usize {
        self.bits.len()
    }
}

/// One-hot rotating counter.
///
/// `clear` forces the last output high and the rest low; each rising edge
/// of `clock` then passes the high output to the next index, wrapping from
/// the last back to the first.
#[derive(Debug, Clone)]
pub struct RingCounter {
    outputs: Vec<NodeId>,
}

impl RingCounter {
    pub fn new(c: &Circuit, size: usize, clock: impl Readable, clear: impl Readable) -> Self {
        let clock = clock.signal();
        let clear = clear.signal();
        let outputs: Vec<NodeId> = (0..size).map(|_| c.node(false)).collect();
        let last = size.saturating_sub(1);
        for i in 0..size {
            let cleared = LatchConfig::default().with_clear(clear);
            let latch = if i == 0 {
                EdgeLatch::new(c, clock, outputs[last], cleared)
            } else if i == last {
                EdgeLatch::new(c, clock, outputs[i - 1], LatchConfig::default().with_preset(clear))
            } else {
                EdgeLatch::new(c, clock, outputs[i - 1], cleared)
            };
            c.link(outputs[i], latch);
        }
        Self { outputs }
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Index of the high output, if exactly one is high.
    pub fn active(&self, c: &Circuit) -> Option<usize> {
        let mut high = (0..self.outputs.len()).filter(|&i| c.read(self.outputs[i]));
        match (high.next(), high.next()) {
            (Some(i), None) => Some(i),
            _ => None,
        }
    }
}

impl ReadableBus for RingCounter {
    fn signals(&self) -> Vec<Signal> {
        self.outputs.signals()
    }

    fn width(&self) -> usize {
        self.outputs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::multi_or;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn toggle(c: &Circuit, node: NodeId) {
        c.write(node, !c.read(node));
    }

    #[test]
    fn test_frequency_divider() {
        let c = Circuit::new();
        let clock = c.node(false);
        let clear = c.node(false);
        let preset = c.node(false);
        let config = LatchConfig::default().with_clear(clear).with_preset(preset).with_state(true);
        let divider = FrequencyDivider::new(&c, clock, config);
        let signals = vec![not(&c, clock), divider.signal()];

        for i in 0..=20u64 {
            toggle(&c, clock);
            assert_eq!(c.read_bus(&signals), i % 4, "divider {i}");
        }
        c.write(clear, true);
        c.write(clear, false);
        assert_eq!(c.read_bus(&signals), 0, "divider clear");
        c.write(preset, true);
        c.write(preset, false);
        assert_eq!(c.read_bus(&signals), 2, "divider preset");
    }

    #[test]
    fn test_ripple_counter() {
        let c = Circuit::new();
        let clock = c.node(false);
        let clear = c.node(false);
        let counter = RippleCounter::new(&c, 4, clock, clear, 0);

        assert_eq!(counter.width(), 4);
        for i in 0..=20u64 {
            assert_eq!(c.read_bus(&counter), i % 16, "ripple {i}");
            toggle(&c, clock);
            toggle(&c, clock);
        }
        c.write(clear, true);
        c.write(clear, false);
        assert_eq!(c.read_bus(&counter), 0, "ripple clear");
    }

    #[test]
    fn test_ripple_counter_initial_state() {
        let c = Circuit::new();
        let clock = c.node(false);
        let counter = RippleCounter::new(&c, 4, clock, Signal::FALSE, 14);
        assert_eq!(c.read_bus(&counter), 14);
        for expected in [15, 0, 1] {
            c.write(clock, true);
            c.write(clock, false);
            assert_eq!(c.read_bus(&counter), expected);
        }
    }

    #[test]
    fn test_address_counter() {
        let c = Circuit::new();
        let clock = c.node(false);
        let address = c.bus(4, 0).unwrap();
        let set = c.node(false);
        let reset = c.node(false);
        let counter = AddressCounter::new(&c, clock, &address, set, reset, 0);

        assert_eq!(c.read_bus(&counter), 0);
        c.write(clock, true);
        c.write(clock, false);
        assert_eq!(c.read_bus(&counter), 1);
        c.write_bus(&address, 3).unwrap();
        assert_eq!(c.read_bus(&counter), 1);
        c.write(set, true);
        c.write(set, false);
        assert_eq!(c.read_bus(&counter), 3);
        c.write(clock, true);
        c.write(clock, false);
        assert_eq!(c.read_bus(&counter), 4);
        c.write(reset, true);
        c.write(reset, false);
        assert_eq!(c.read_bus(&counter), 0);
    }

    fn pairwise_collision(c: &Circuit, counter: &RingCounter) -> Signal {
        let outputs = counter.outputs();
        let mut pairs = Vec::new();
        for i in 0..outputs.len() {
            for j in i + 1..outputs.len() {
                pairs.push(and(c, outputs[i], outputs[j]));
            }
        }
        multi_or(c, &pairs)
    }

    #[test]
    fn test_ring_counter() {
        let c = Circuit::new();
        let clock = c.node(false);
        let clear = c.node(false);
        let size = 4;
        let counter = RingCounter::new(&c, size, clock, clear);

        let collision = pairwise_collision(&c, &counter);
        let collided = Rc::new(Cell::new(false));
        let flag = collided.clone();
        c.subscribe(collision, move |_, v| flag.set(flag.get() || v));

        assert_eq!(counter.width(), size);
        assert_eq!(c.read_bus(&counter), 0, "ring init");
        c.write(clear, true);
        c.write(clear, false);
        assert_eq!(counter.active(&c), Some(size - 1), "ring cleared");

        for i in 0..=10 {
            c.write(clock, true);
            assert_eq!(counter.active(&c), Some(i % size), "ring rising {i}");
            c.write(clock, false);
            assert_eq!(counter.active(&c), Some(i % size), "ring falling {i}");
        }

        c.write(clear, true);
        c.write(clock, true);
        c.write(clear, false);
        assert_eq!(counter.active(&c), Some(size - 1), "ring clear with clock high");
        assert!(!collided.get(), "ring counter outputs collided");
    }

    proptest! {
        #[test]
        fn property_ring_counter_one_hot(pulses in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..40)) {
            let c = Circuit::new();
            let clock = c.node(false);
            let clear = c.node(false);
            let counter = RingCounter::new(&c, 3, clock, clear);

            c.write(clear, true);
            c.write(clear, false);
            for (is_clear, level) in pulses {
                if is_clear {
                    c.write(clear, level);
                } else {
                    c.write(clock, level);
                }
                prop_assert_eq!(c.read_bus(&counter).count_ones(), 1);
            }
        }
    }
}
