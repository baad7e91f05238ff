//! OSTF adapter library.
//!
//! Tracks health-check test runs against cloud clusters: the test catalog,
//! per-cluster applicability, run lifecycle and the drivers that launch the
//! external test runner.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
