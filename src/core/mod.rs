//! # Core Module
//!
//! Concurrency primitives shared by the rest of the engine.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking,
//!   non-blocking reads and scoped access helpers

pub mod mt_resource;

pub use mt_resource::MtResource;
