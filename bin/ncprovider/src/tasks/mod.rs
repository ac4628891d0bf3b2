pub mod deploy;
pub mod task_queue;
