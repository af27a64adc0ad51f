//! Job scheduling for Rivet CI: matrix expansion and queue routing.

pub mod matrix;
pub mod queue;

pub use matrix::{MatrixExpander, MatrixExpansion, MatrixJob};
pub use queue::{DEFAULT_QUEUE, Queue, QueueConfigSource, QueueRouter, QueueSettings};
