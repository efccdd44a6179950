//! Domain types and models

pub mod credentials;
pub mod envelope;
pub mod task;

pub use credentials::Credentials;
pub use envelope::{ApiFailure, Envelope, Response, Stat};
pub use task::{Priority, Task, TaskFilter, TaskList, TaskListEntry, TaskRef, TaskSeries};
