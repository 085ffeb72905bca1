//! # Task Management System
//!
//! A single background worker that runs one task at a time.
//!
//! ## Architecture Overview
//! - `TaskWorker`: owns the worker thread and both channels
//! - `Task`: a unit of work moved to the worker and answered with an `Output`
//!
//! ## Task Lifecycle
//! 1. The render thread publishes a task with `TaskWorker::try_publish()`,
//!    which fails while another task is in flight
//! 2. The worker processes it and sends the output back
//! 3. The worker clears the busy flag after the output is sent
//! 4. The render thread collects the output with `TaskWorker::try_take_result()`
//!
//! Because the output is sent before the busy flag is cleared, observing the
//! flag cleared guarantees the output is already waiting in the channel. A
//! task that panics kills the worker; the channels are disconnected before the
//! flag is cleared, so the publisher sees the worker gone instead of waiting on
//! it forever.
//!
//! ## Example Usage
//! ```rust
//! use octree_voxel_engine::engine_state::task_management::{task::Task, TaskWorker};
//!
//! struct Square(u64);
//!
//! impl Task for Square {
//!     type Output = u64;
//!
//!     fn process(self) -> u64 {
//!         self.0 * self.0
//!     }
//! }
//!
//! let mut worker = TaskWorker::new("square-worker");
//! assert!(worker.try_publish(Square(12)).is_ok());
//! assert_eq!(worker.wait_for_result(), Some(144));
//! ```

pub mod task;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, SendError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use task::Task;

/// A background thread processing one task at a time.
///
/// # Implementation Notes
/// - The busy flag is set by `try_publish` with a compare-and-swap and cleared
///   by the worker, so at most one task is ever in flight
/// - Dropping the worker closes the task channel and joins the thread
pub struct TaskWorker<T: Task> {
    name: String,
    task_sender: Option<Sender<T>>,
    result_receiver: Receiver<T::Output>,
    busy: Arc<AtomicBool>,
    in_flight: bool,
    disconnected: bool,
    tasks_dispatched: usize,
    worker: Option<JoinHandle<()>>,
}

/// The worker thread's side of both channels.
///
/// Dropping it, on a normal exit or while unwinding from a panicking task,
/// disconnects both channels before clearing the busy flag. A publisher that
/// sees the flag cleared therefore either finds the result waiting or finds
/// the worker gone.
struct WorkerEnd<T: Task> {
    name: String,
    tasks: Option<Receiver<T>>,
    results: Option<Sender<T::Output>>,
    busy: Arc<AtomicBool>,
}

impl<T: Task> WorkerEnd<T> {
    fn run(self) {
        let (Some(tasks), Some(results)) = (&self.tasks, &self.results) else {
            return;
        };

        while let Ok(task) = tasks.recv() {
            let result = task.process();
            let sent = results.send(result);
            self.busy.store(false, Ordering::Release);
            if sent.is_err() {
                break;
            }
        }
    }
}

impl<T: Task> Drop for WorkerEnd<T> {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("Worker '{}' panicked while processing a task", self.name);
        }
        self.tasks = None;
        self.results = None;
        self.busy.store(false, Ordering::Release);
    }
}

impl<T: Task> TaskWorker<T> {
    /// Spawns the worker thread.
    ///
    /// # Panics
    /// Panics if the operating system refuses to create the thread.
    pub fn new(name: &str) -> Self {
        let (task_tx, task_rx) = channel::<T>();
        let (result_tx, result_rx) = channel::<T::Output>();
        let busy = Arc::new(AtomicBool::new(false));

        let worker_end = WorkerEnd {
            name: name.to_string(),
            tasks: Some(task_rx),
            results: Some(result_tx),
            busy: busy.clone(),
        };
        let task_closure = move || worker_end.run();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(task_closure)
            .unwrap_or_else(|error| panic!("failed to spawn worker '{}': {}", name, error));

        debug!("Spawned worker thread '{}'", name);

        TaskWorker {
            name: name.to_string(),
            task_sender: Some(task_tx),
            result_receiver: result_rx,
            busy,
            in_flight: false,
            disconnected: false,
            tasks_dispatched: 0,
            worker: Some(worker),
        }
    }

    /// Whether a task is being processed.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether the worker thread can still accept tasks.
    ///
    /// Turns `false` once the worker is found gone: a missing result, a failed
    /// publish, or [`TaskWorker::shutdown`].
    pub fn is_alive(&self) -> bool {
        !self.disconnected && self.worker.is_some()
    }

    /// Number of tasks handed to the worker so far.
    pub fn tasks_dispatched(&self) -> usize {
        self.tasks_dispatched
    }

    /// Hands `task` to the worker.
    ///
    /// # Returns
    /// - `Ok(())` if the worker accepted the task
    /// - `Err(task)` if a task is already in flight, its output has not been
    ///   collected yet, or the worker is gone
    pub fn try_publish(&mut self, task: T) -> Result<(), T> {
        if self.in_flight {
            return Err(task);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(task);
        }

        let Some(sender) = &self.task_sender else {
            self.busy.store(false, Ordering::Release);
            return Err(task);
        };

        match sender.send(task) {
            Ok(()) => {
                self.in_flight = true;
                self.tasks_dispatched += 1;
                Ok(())
            }
            Err(SendError(task)) => {
                warn!("Worker '{}' disconnected, task not dispatched", self.name);
                self.disconnected = true;
                self.busy.store(false, Ordering::Release);
                Err(task)
            }
        }
    }

    /// Takes the output of the finished task, if there is one.
    ///
    /// Never blocks.
    pub fn try_take_result(&mut self) -> Option<T::Output> {
        if !self.in_flight || self.is_busy() {
            return None;
        }

        match self.result_receiver.try_recv() {
            Ok(result) => {
                self.in_flight = false;
                Some(result)
            }
            Err(TryRecvError::Disconnected) => {
                warn!("Worker '{}' stopped without a result", self.name);
                self.in_flight = false;
                self.disconnected = true;
                None
            }
            Err(TryRecvError::Empty) => {
                warn!("Worker '{}' finished without a result", self.name);
                self.in_flight = false;
                None
            }
        }
    }

    /// Blocks until the in-flight task finishes and returns its output.
    ///
    /// Returns `None` immediately if nothing is in flight.
    pub fn wait_for_result(&mut self) -> Option<T::Output> {
        if !self.in_flight {
            return None;
        }

        let result = self.result_receiver.recv().ok();
        if result.is_none() {
            warn!("Worker '{}' exited with a task in flight", self.name);
            self.disconnected = true;
        }
        while self.is_busy() {
            thread::yield_now();
        }
        self.in_flight = false;
        result
    }

    /// Closes the task channel and joins the worker thread.
    ///
    /// A task in flight runs to completion first; its output is discarded.
    pub fn shutdown(&mut self) {
        self.task_sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Worker '{}' panicked", self.name);
            }
            debug!("Joined worker thread '{}'", self.name);
        }
        self.in_flight = false;
        self.disconnected = true;
    }
}

impl<T: Task> Drop for TaskWorker<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
