//! Test utilities for logkeep.
//!
//! This module provides reusable helpers for building test configurations.
//!
//! # Feature Flag
//!
//! This module is only available when the `testing` feature is enabled or during tests:
//!
//! ```toml
//! [dev-dependencies]
//! common = { path = "../common", features = ["testing"] }
//! ```

mod config_builder;

pub use config_builder::TestConfigBuilder;
