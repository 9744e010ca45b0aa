//! Addressable memory built from level latches.
//!
//! A [`Ram`] stores one bit per address, [`MultiRam`] one word per address,
//! and [`ControlPanelRam`] puts a second driver in front of a [`MultiRam`]
//! so a console can take over the array.

use crate::logic::{multi_decoder, multi_selector, selector};
use crate::sequential::{LatchConfig, LevelLatch};
use crate::signal::{Circuit, Readable, ReadableBus, Signal};

/// One-bit storage array with `2^n` cells for an `n`-bit address.
///
/// The addressed cell tracks `data` for as long as `write` is high; the
/// output always shows the addressed cell.
#[derive(Debug, Clone)]
pub struct Ram {
    output: Signal,
    cells: Vec<LevelLatch>,
}

impl Ram {
    pub fn new<A>(c: &Circuit, address: &A, data: impl Readable, write: impl Readable) -> Self
    where
        A: ReadableBus + ?Sized,
    {
        let data = data.signal();
        let lines = multi_decoder(c, address, write);
        let cells: Vec<LevelLatch> = lines
            .into_iter()
            .map(|line| LevelLatch::new(c, line, data, LatchConfig::default()))
            .collect();
        let output = multi_selector(c, address, &cells);
        Self { output, cells }
    }

    /// Number of addressable cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Readable for Ram {
    fn signal(&self) -> Signal {
        self.output
    }
}

/// Word-wide storage: one [`Ram`] per data bit sharing address and write.
#[derive(Debug, Clone)]
pub struct MultiRam {
    bits: Vec<Ram>,
}

impl MultiRam {
    pub fn new<A, D>(c: &Circuit, address: &A, data: &D, write: impl Readable) -> Self
    where
        A: ReadableBus + ?Sized,
        D: ReadableBus + ?Sized,
    {
        let write = write.signal();
        let bits = data
            .signals()
            .into_iter()
            .map(|bit| Ram::new(c, address, bit, write))
            .collect();
        Self { bits }
    }
}

impl ReadableBus for MultiRam {
    fn signals(&self) -> Vec<Signal> {
        self.bits.signals()
    }

    fn width(&self) -> usize {
        self.bits.len()
    }
}

/// One complete set of memory inputs.
#[derive(Debug, Clone, Default)]
pub struct RamDriver {
    pub address: Vec<Signal>,
    pub data: Vec<Signal>,
    pub write: Signal,
}

impl RamDriver {
    pub fn new<A, D>(address: &A, data: &D, write: impl Readable) -> Self
    where
        A: ReadableBus + ?Sized,
        D: ReadableBus + ?Sized,
    {
        Self {
            address: address.signals(),
            data: data.signals(),
            write: write.signal(),
        }
    }
}

/// A [`MultiRam`] shared by two drivers.
///
/// While `takeover` is low the primary driver is connected; while it is
/// high the override driver is connected instead. Switching while a write
/// line is high lets cells along the way see the changing address and
/// data, so a console should only switch with both writes low.
#[derive(Debug, Clone)]
pub struct ControlPanelRam {
    ram: MultiRam,
}

impl ControlPanelRam {
    pub fn new(c: &Circuit, primary: &RamDriver, takeover: impl Readable, console: &RamDriver) -> Self {
        let takeover = takeover.signal();
        let address: Vec<Signal> = primary
            .address
            .iter()
            .zip(&console.address)
            .map(|(&a, &b)| selector(c, takeover, a, b))
            .collect();
        let data: Vec<Signal> = primary
            .data
            .iter()
            .zip(&console.data)
            .map(|(&a, &b)| selector(c, takeover, a, b))
            .collect();
        let write = selector(c, takeover, primary.write, console.write);
        let ram = MultiRam::new(c, &address, &data, write);
        Self { ram }
    }
}

impl ReadableBus for ControlPanelRam {
    fn signals(&self) -> Vec<Signal> {
        self.ram.signals()
    }

    fn width(&self) -> usize {
        self.ram.width()
    }
}
