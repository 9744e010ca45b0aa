//! Stateless logic: gates, selectors, decoders and adders.

pub mod adders;
pub mod gates;
pub mod selectors;

pub use adders::{ones_complement, AddSubtract, FullAdder, HalfAdder, MultiAdder};
pub use gates::{and, multi_and, multi_nand, multi_nor, multi_or, nand, nor, not, or, xor};
pub use selectors::{multi_decoder, multi_decoder_bus, multi_selector, selector};
