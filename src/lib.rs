//! Batch QA tool for the wine-label scan API.
//!
//! Submits a batch of label images, polls each submission until the service
//! reports a terminal result, cross-checks the linked label and user-vintage
//! resources for referential integrity, and records one result row per input.

pub mod config;
pub mod models;
pub mod services;
