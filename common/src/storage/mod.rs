pub mod job_store;
pub mod store;
pub mod types;
