//! Supporting data structures: the dense [`BitSet`], the graph abstractions and DOT
//! helpers.

mod bitset;
mod dot;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
pub use dot::escape_dot;
