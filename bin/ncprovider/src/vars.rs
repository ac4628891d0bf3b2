/// Prefix of the hash holding the lease of a job
pub const LEASE_PREFIX: &str = "ncprovider:lease:";
/// Value of the ttl key of a job, only its existence matters
pub const LEASE_SENTINEL: &str = "wait-delete";
/// Label selecting every object created for a workload
pub const WORKLOAD_LABEL: &str = "ncprovider.io/workload";
/// Label holding the tenant wallet on namespaces
pub const WALLET_LABEL: &str = "ncprovider.io/wallet";
/// Accelerator resource name requested by containers
pub const GPU_RESOURCE: &str = "nvidia.com/gpu";
/// Environment variables rewritten to the public url of the workload
pub const CALLBACK_ENV: &str = "NEXTAUTH_URL";
/// Length of the random prefix of generated hosts
pub const HOST_PREFIX_LEN: usize = 10;
/// Storage granted to every workload
pub const STORAGE_QUANTITY: i64 = 30;
pub const STORAGE_UNIT: &str = "Gi";
/// Seconds the deploy confirmation is awaited
pub const DEPLOY_WAIT_SECS: u64 = 180;
/// Seconds before a failed expiry teardown is attempted again
pub const TEARDOWN_RETRY_SECS: u64 = 60;
/// Jobs tracked by the status publisher before finished ones are forgotten
pub const STATUS_TRACKED_JOBS: usize = 4096;
/// Capacity of the job status channel
pub const STATUS_CHANNEL_SIZE: usize = 256;
/// Reply to a renewal of an expired lease
pub const LEASE_EXPIRED_MSG: &str =
  "The job was terminated due to its expiration date";
/// Largest json body accepted by the http api
pub const MAX_JSON_PAYLOAD: usize = 4 * 1024 * 1024;
