pub mod cluster_resource;
pub mod deployment;
pub mod docker;
pub mod gpu_pool;
pub mod hardware;
pub mod job;
pub mod job_status;
pub mod key;
pub mod kube;
pub mod lease;
pub mod manifest;
pub mod network;
pub mod source;
pub mod store;
pub mod teardown;

#[cfg(test)]
pub mod tests;
