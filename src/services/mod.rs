//! Business logic services.

pub mod catalog;
pub mod discovery;
pub mod dispatcher;
pub mod lifecycle;

pub use dispatcher::{DriverRegistry, ProcessDriver, TestDriver};
pub use lifecycle::{RunOptions, RunTracker};
