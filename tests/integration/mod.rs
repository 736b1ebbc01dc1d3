//! Integration tests for StaySmart.

pub mod auth_test;
pub mod lifecycle_test;
pub mod stats_test;
pub mod store_test;
pub mod support;
