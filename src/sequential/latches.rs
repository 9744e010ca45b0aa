//! Memory cells: the set-reset flip-flop and the D-latches built on it.

use crate::logic::{and, not, or};
use crate::signal::{bits, Circuit, NodeId, Readable, ReadableBus, Signal};

/// A stateful output with a complementary `bar` output.
pub trait Invertible: Readable {
    fn bar(&self) -> Signal;
}

/// Optional inputs shared by every latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatchConfig {
    /// Forces the state false while high.
    pub clear: Signal,
    /// Forces the state true while high.
    pub preset: Signal,
    /// Initial state.
    pub state: bool,
}

impl LatchConfig {
    pub fn with_clear(mut self, clear: impl Readable) -> Self {
        self.clear = clear.signal();
        self
    }

    pub fn with_preset(mut self, preset: impl Readable) -> Self {
        self.preset = preset.signal();
        self
    }

    pub fn with_state(mut self, state: bool) -> Self {
        self.state = state;
        self
    }
}

/// Set-reset flip-flop.
///
/// `s` sets, `r` resets, neither holds. Reset wins while both are high, so
/// `q` and `bar` always disagree. The state is driven from the inputs alone,
/// so it settles after any input sequence, including both inputs falling in
/// one settling wave.
#[derive(Debug, Clone, Copy)]
pub struct FlipFlop {
    q: NodeId,
    bar: NodeId,
}

impl FlipFlop {
    pub fn new(c: &Circuit, r: impl Readable, s: impl Readable, state: bool) -> Self {
        let (r, s) = (r.signal(), s.signal());
        let q = c.node(state);
        let bar = c.node(!state);
        c.link_inverted(bar, q);
        let drive = move |c: &Circuit, _: bool| {
            if c.read(r) {
                c.write(q, false);
            } else if c.read(s) {
                c.write(q, true);
            }
        };
        c.subscribe(r, drive);
        c.subscribe(s, drive);
        Self { q, bar }
    }
}

impl Readable for FlipFlop {
    fn signal(&self) -> Signal {
        Signal::Node(self.q)
    }
}

impl Invertible for FlipFlop {
    fn bar(&self) -> Signal {
        Signal::Node(self.bar)
    }
}

/// Level-triggered D-latch: tracks `data` while `clock` is high.
///
/// `clear` and `preset` act regardless of `clock`. The drive lines are
/// `r = ((clock & !data) | clear) & !preset` and
/// `s = ((clock & data) | preset) & !clear`, so once settled `r` and `s`
/// are never high together.
#[derive(Debug, Clone, Copy)]
pub struct LevelLatch(FlipFlop);

impl LevelLatch {
    pub fn new(c: &Circuit, clock: impl Readable, data: impl Readable, config: LatchConfig) -> Self {
        let (clock, data) = (clock.signal(), data.signal());
        let LatchConfig { clear, preset, state } = config;

        let not_data = not(c, data);
        let sample_low = and(c, clock, not_data);
        let low_or_clear = or(c, sample_low, clear);
        let not_preset = not(c, preset);
        let r = and(c, low_or_clear, not_preset);

        let sample_high = and(c, clock, data);
        let high_or_preset = or(c, sample_high, preset);
        let not_clear = not(c, clear);
        let s = and(c, high_or_preset, not_clear);

        Self(FlipFlop::new(c, r, s, state))
    }
}

impl Readable for LevelLatch {
    fn signal(&self) -> Signal {
        self.0.signal()
    }
}

impl Invertible for LevelLatch {
    fn bar(&self) -> Signal {
        self.0.bar()
    }
}

/// Master/slave D-latch: samples `data` once per rising edge of `clock`.
///
/// Both stages start in the configured state, so the output holds it even
/// when `clock` is already high at construction.
#[derive(Debug, Clone, Copy)]
pub struct EdgeLatch {
    slave: LevelLatch,
}

impl EdgeLatch {
    pub fn new(c: &Circuit, clock: impl Readable, data: impl Readable, config: LatchConfig) -> Self {
        let clock = clock.signal();
        let inverted = not(c, clock);
        let master = LevelLatch::new(c, inverted, data, config);
        let slave = LevelLatch::new(c, clock, master, config);
        Self { slave }
    }
}

impl Readable for EdgeLatch {
    fn signal(&self) -> Signal {
        self.slave.signal()
    }
}

impl Invertible for EdgeLatch {
    fn bar(&self) -> Signal {
        self.slave.bar()
    }
}

// ==================== Multi-bit latches ====================

/// Optional inputs for a latch array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiLatchConfig {
    pub clear: Signal,
    /// Per-bit presets; missing entries are constant false.
    pub presets: Vec<Signal>,
    /// Initial value, bit `i` seeding latch `i`.
    pub state: u64,
}

impl MultiLatchConfig {
    pub fn with_clear(mut self, clear: impl Readable) -> Self {
        self.clear = clear.signal();
        self
    }

    pub fn with_presets<B: ReadableBus + ?Sized>(mut self, presets: &B) -> Self {
        self.presets = presets.signals();
        self
    }

    pub fn with_state(mut self, state: u64) -> Self {
        self.state = state;
        self
    }

    fn bit(&self, i: usize) -> LatchConfig {
        LatchConfig {
            clear: self.clear,
            preset: self.presets.get(i).copied().unwrap_or(Signal::FALSE),
            state: bits::nth_bit(self.state, i),
        }
    }
}

/// A latch per bit of `data` over one shared clock.
#[derive(Debug, Clone)]
pub struct MultiLatch<L> {
    bits: Vec<L>,
}

pub type MultiLevelLatch = MultiLatch<LevelLatch>;
pub type MultiEdgeLatch = MultiLatch<EdgeLatch>;

impl MultiLevelLatch {
    pub fn new<B>(c: &Circuit, clock: impl Readable, data: &B, config: MultiLatchConfig) -> Self
    where
        B: ReadableBus + ?Sized,
    {
        let clock = clock.signal();
        let bits = data
            .signals()
            .into_iter()
            .enumerate()
            .map(|(i, bit)| LevelLatch::new(c, clock, bit, config.bit(i)))
            .collect();
        Self { bits }
    }
}

impl MultiEdgeLatch {
    pub fn new<B>(c: &Circuit, clock: impl Readable, data: &B, config: MultiLatchConfig) -> Self
    where
        B: ReadableBus + ?Sized,
    {
        let clock = clock.signal();
        let bits = data
            .signals()
            .into_iter()
            .enumerate()
            .map(|(i, bit)| EdgeLatch::new(c, clock, bit, config.bit(i)))
            .collect();
        Self { bits }
    }
}

impl<L: Invertible> MultiLatch<L> {
    pub fn bits(&self) -> &[L] {
        &self.bits
    }

    /// Complementary outputs, one per bit.
    pub fn bar(&self) -> Vec<Signal> {
        self.bits.iter().map(Invertible::bar).collect()
    }
}

impl<L: Invertible> ReadableBus for MultiLatch<L> {
    fn signals(&self) -> Vec<Signal> {
        self.bits.signals()
    }

    fn width(&self) -> usize {
        self.bits.len()
    }
}
