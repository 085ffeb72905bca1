//! # Task System Core Trait
//!
//! A `Task` is a self-contained unit of work moved to the worker thread,
//! processed there, and answered with an `Output` sent back to the thread that
//! published it.
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred to the worker
//! - `Output` must be `Send` to be transferred back
//! - Anything shared with the render thread must be behind its own lock

/// A unit of work executed on a [`TaskWorker`](super::TaskWorker).
///
/// # Implementation Guidelines
/// - Should own all the data it needs
/// - Should be coarse-grained; the worker runs one task at a time
pub trait Task: Send + 'static {
    /// What the task hands back to the publishing thread.
    type Output: Send + 'static;

    /// Processes the task on the worker thread.
    fn process(self) -> Self::Output;
}
