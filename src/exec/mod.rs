// src/exec/mod.rs

//! Process execution layer.
//!
//! Thread-per-child with blocking IO:
//!
//! - [`worker`] owns one spawned child, drives its run loop on a dedicated
//!   thread and reports a [`WorkerExit`] when done.
//! - [`stream`] contains the per-pipe line reader threads and the
//!   [`WorkerEvent`]s they feed into the worker.

pub mod stream;
pub mod worker;

pub use stream::{StreamKind, WorkerEvent};
pub use worker::{Worker, WorkerExit};
