pub mod scan;
pub mod task;
