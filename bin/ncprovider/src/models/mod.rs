mod system;
pub use system::*;

mod gpu_pool;
pub use gpu_pool::*;

mod lease;
pub use lease::*;

mod task_queue;
pub use task_queue::*;

mod job_status;
pub use job_status::*;

mod cluster;
pub use cluster::*;

mod builder;
pub use builder::*;

mod source;
pub use source::*;

mod teardown;
pub use teardown::*;

mod job;
pub use job::*;
