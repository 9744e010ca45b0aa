//! Stateful circuits: latches and the counters built from them.

pub mod counters;
pub mod latches;

pub use counters::{AddressCounter, FrequencyDivider, RingCounter, RippleCounter};
pub use latches::{
    EdgeLatch, FlipFlop, Invertible, LatchConfig, LevelLatch, MultiEdgeLatch, MultiLatch,
    MultiLatchConfig, MultiLevelLatch,
};
