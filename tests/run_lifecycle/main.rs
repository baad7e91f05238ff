//! Test run lifecycle suite.
//!
//! Runs against a temporary SQLite database with a fixed catalog loaded.
//! Drivers are faked except in `test_process_driver`, which spawns real
//! processes and only runs on Unix.
//!
//! Run with: cargo test --test run_lifecycle


mod test_catalog;
#[cfg(unix)]
mod test_process_driver;
mod test_restart;
mod test_results;
mod test_stop;
