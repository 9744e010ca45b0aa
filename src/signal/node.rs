//! Handles into the circuit arena and the read capabilities built on them.

use std::fmt;

/// Handle to a live node owned by a [`Circuit`](super::Circuit).
///
/// Handles are plain indices: copying one never copies the node, and a
/// node may be referenced from any number of subscriptions, including its
/// own feedback network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in its circuit's arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A two-state value source: either a fixed constant or a live node.
///
/// Constants carry no subscriber list. Gates fold them at construction
/// time instead of allocating nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    Constant(bool),
    Node(NodeId),
}

impl Signal {
    pub const TRUE: Signal = Signal::Constant(true);
    pub const FALSE: Signal = Signal::Constant(false);

    /// The backing node, if this signal is live.
    pub fn node(self) -> Option<NodeId> {
        match self {
            Signal::Constant(_) => None,
            Signal::Node(id) => Some(id),
        }
    }

    pub fn is_constant(self) -> bool {
        matches!(self, Signal::Constant(_))
    }
}

impl Default for Signal {
    fn default() -> Self {
        Signal::FALSE
    }
}

impl From<bool> for Signal {
    fn from(value: bool) -> Self {
        Signal::Constant(value)
    }
}

impl From<NodeId> for Signal {
    fn from(id: NodeId) -> Self {
        Signal::Node(id)
    }
}

// ==================== Capabilities ====================

/// Anything exposing a single two-state output.
pub trait Readable {
    fn signal(&self) -> Signal;
}

/// Anything exposing an ordered sequence of outputs, least significant
/// bit first.
pub trait ReadableBus {
    fn signals(&self) -> Vec<Signal>;

    fn width(&self) -> usize {
        self.signals().len()
    }
}

impl Readable for Signal {
    fn signal(&self) -> Signal {
        *self
    }
}

impl Readable for NodeId {
    fn signal(&self) -> Signal {
        Signal::Node(*self)
    }
}

impl Readable for bool {
    fn signal(&self) -> Signal {
        Signal::Constant(*self)
    }
}

impl<T: Readable + ?Sized> Readable for &T {
    fn signal(&self) -> Signal {
        (**self).signal()
    }
}

impl<T: Readable> ReadableBus for [T] {
    fn signals(&self) -> Vec<Signal> {
        self.iter().map(Readable::signal).collect()
    }

    fn width(&self) -> usize {
        self.len()
    }
}

impl<T: Readable> ReadableBus for Vec<T> {
    fn signals(&self) -> Vec<Signal> {
        self.as_slice().signals()
    }

    fn width(&self) -> usize {
        self.len()
    }
}

impl<T: Readable, const N: usize> ReadableBus for [T; N] {
    fn signals(&self) -> Vec<Signal> {
        self.as_slice().signals()
    }

    fn width(&self) -> usize {
        N
    }
}

impl<B: ReadableBus + ?Sized> ReadableBus for &B {
    fn signals(&self) -> Vec<Signal> {
        (**self).signals()
    }

    fn width(&self) -> usize {
        (**self).width()
    }
}
