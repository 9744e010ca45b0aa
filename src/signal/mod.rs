//! Two-state signal nodes and the propagation engine.
//!
//! This module provides the primitive every other layer is built from:
//! - [`Circuit`] - the node arena and its breadth-first settling queue
//! - [`Signal`] - a constant or a handle to a live node
//! - [`Readable`] / [`ReadableBus`] - the read capabilities components expose
//! - [`bits`] - integer conversions for multi-bit buses

pub mod bits;
mod circuit;
mod node;

pub use bits::BitsError;
pub use circuit::{Circuit, SubscriptionId};
pub(crate) use circuit::Combinator;
pub use node::{NodeId, Readable, ReadableBus, Signal};
