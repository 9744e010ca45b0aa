//! Clock driver: a node that toggles itself until told to stop.

use std::cell::Cell;
use std::rc::Rc;

use crate::signal::{Circuit, NodeId, Readable, Signal};

/// Stops a running [`Oscillator`] from inside a circuit callback.
///
/// The request is seen between toggles, never in the middle of one.
#[derive(Debug, Clone)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.set(false);
    }
}

/// Self-toggling clock source.
///
/// An oscillator is only ever run for a bounded number of toggles or until
/// some condition holds; [`Oscillator::start`] without a [`StopHandle`]
/// wired into the circuit never returns.
#[derive(Debug, Clone)]
pub struct Oscillator {
    node: NodeId,
    active: Rc<Cell<bool>>,
}

impl Oscillator {
    pub fn new(c: &Circuit, state: bool) -> Self {
        Self {
            node: c.node(state),
            active: Rc::new(Cell::new(false)),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.active.clone())
    }

    pub fn stop(&self) {
        self.active.set(false);
    }

    /// Flip the output once and let the circuit settle.
    pub fn tick(&self, c: &Circuit) {
        c.write(self.node, !c.read(self.node));
    }

    /// Toggle until a [`StopHandle`] fires. No-op while already running.
    pub fn start(&self, c: &Circuit) -> u64 {
        self.run_until(c, |_| false)
    }

    /// Toggle until `condition` holds or the oscillator is stopped.
    ///
    /// `condition` is checked before the first toggle and after every
    /// toggle. Returns the number of toggles performed.
    pub fn run_until<F>(&self, c: &Circuit, mut condition: F) -> u64
    where
        F: FnMut(&Circuit) -> bool,
    {
        if self.active.get() {
            return 0;
        }
        self.active.set(true);
        let mut ticks = 0;
        while self.active.get() && !condition(c) {
            self.tick(c);
            ticks += 1;
        }
        self.active.set(false);
        tracing::trace!(target: "codecomputer::oscillator", ticks, "oscillator stopped");
        ticks
    }

    /// Toggle `cycles` times, calling `listener` with the toggle count
    /// before each toggle.
    pub fn run<F>(&self, c: &Circuit, cycles: u64, mut listener: F) -> u64
    where
        F: FnMut(&Circuit, u64),
    {
        let mut i = 0;
        self.run_until(c, |c| {
            if i >= cycles {
                return true;
            }
            listener(c, i);
            i += 1;
            false
        })
    }
}

impl Readable for Oscillator {
    fn signal(&self) -> Signal {
        Signal::Node(self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYCLES: u64 = 10;

    #[test]
    fn test_oscillator_run() {
        let c = Circuit::new();
        let oscillator = Oscillator::new(&c, false);
        let mut counter = 0;
        let ticks = oscillator.run(&c, CYCLES, |c, i| {
            counter = i;
            assert_eq!(c.read(&oscillator), i % 2 != 0, "oscillator event {i}");
        });
        assert_eq!(counter, CYCLES - 1);
        assert_eq!(ticks, CYCLES);
        assert!(!c.read(&oscillator));
        assert!(!oscillator.is_active());
    }

    #[test]
    fn test_oscillator_run_one() {
        let c = Circuit::new();
        let oscillator = Oscillator::new(&c, false);
        let mut counter = 0;
        for i in 0..CYCLES {
            oscillator.run(&c, 1, |c, j| {
                assert_eq!(j, 0);
                assert_eq!(c.read(&oscillator), i % 2 != 0, "oscillator event {i}");
                counter = i;
            });
        }
        assert_eq!(counter, CYCLES - 1);
    }

    #[test]
    fn test_run_until_checks_before_first_toggle() {
        let c = Circuit::new();
        let oscillator = Oscillator::new(&c, true);
        assert_eq!(oscillator.run_until(&c, |c| c.read(&oscillator)), 0);
        assert_eq!(oscillator.run_until(&c, |c| !c.read(&oscillator)), 1);
    }

    #[test]
    fn test_stop_from_subscriber() {
        let c = Circuit::new();
        let oscillator = Oscillator::new(&c, false);
        let handle = oscillator.stop_handle();
        let rising = Rc::new(Cell::new(0));
        let seen = rising.clone();
        c.subscribe(&oscillator, move |_, high| {
            if high {
                seen.set(seen.get() + 1);
                if seen.get() == 3 {
                    handle.stop();
                }
            }
        });

        assert_eq!(oscillator.start(&c), 5);
        assert_eq!(rising.get(), 3);
        assert!(c.read(&oscillator));
    }
}
