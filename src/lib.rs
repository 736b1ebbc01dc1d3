//! StaySmart - data access for dormitory management.
//!
//! This library exposes the store, its domain operations and authentication
//! for the front end, the admin binary and the integration tests.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod persistence;

pub use error::{Result, StaySmartError};
pub use persistence::StaySmartDb;
