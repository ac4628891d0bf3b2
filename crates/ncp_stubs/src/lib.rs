pub mod config;
pub mod job;
pub mod lease;
pub mod resource;
pub mod space;
pub mod system;
pub mod workload;
