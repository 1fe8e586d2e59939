pub mod api;
pub mod auth;
pub mod batch;
pub mod contradiction;
pub mod integrity;
pub mod metadata;
pub mod report;
