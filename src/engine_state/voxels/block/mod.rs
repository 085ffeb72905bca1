//! # Block Module
//!
//! Block type definitions and the axis/face vocabulary used by meshing.

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block type ids.
pub type BlockTypeSize = u16;
