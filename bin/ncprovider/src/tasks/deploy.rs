use std::{panic::AssertUnwindSafe, path::Path, time::Duration};

use futures::FutureExt;
use ntex::rt;

use ncp_error::io::{IoError, IoResult};
use ncp_stubs::{
  job::{Job, JobDeleteQuery, JobPartial, JobRenew, JobRenewResponse, JobStatus},
  workload::ImageWorkload,
};

use crate::{
  models::{SystemState, TaskKind, WorkloadSourceKind},
  subsystem,
  utils::{
    self,
    deployment::{self, DeployContext},
  },
  vars,
};

fn now() -> i64 {
  chrono::Utc::now().timestamp()
}

fn check_partial(partial: &JobPartial) -> IoResult<()> {
  if partial.uuid.trim().is_empty() {
    return Err(IoError::invalid_input("Job", "uuid is required"));
  }
  let source = url::Url::parse(partial.job_source_uri.trim()).map_err(|err| {
    IoError::invalid_input(
      "Job",
      format!("{} source uri: {err}", partial.uuid),
    )
  })?;
  if !matches!(source.scheme(), "http" | "https") {
    return Err(IoError::invalid_input(
      "Job",
      format!("{} source uri must be http or https", partial.uuid),
    ));
  }
  if partial.duration == 0 {
    return Err(IoError::invalid_input(
      "Job",
      format!("{} duration must be positive", partial.uuid),
    ));
  }
  utils::lease::seconds(&partial.uuid, partial.duration)?;
  Ok(())
}

/// Accept a new job, the deploy runs in the background
pub async fn receive(partial: JobPartial, state: &SystemState) -> IoResult<Job> {
  check_partial(&partial)?;
  let host = utils::key::gen_host(&state.config.domain);
  let job = Job::from_partial(partial, &host, now());
  state.jobs.save(&job).await?;
  state.status.publish(&job.uuid, JobStatus::Submitted);
  log::info!("deploy::receive: {} will be routed to {host}", job.uuid);
  dispatch(TaskKind::Deploy, &job, state).await;
  Ok(job)
}

/// Deploy a job again, keeping the host of its previous result when known
pub async fn redeploy(
  partial: JobPartial,
  state: &SystemState,
) -> IoResult<Job> {
  check_partial(&partial)?;
  let host = match partial
    .job_result_uri
    .as_deref()
    .filter(|uri| !uri.trim().is_empty())
  {
    Some(uri) => state.source.fetch_result_host(uri).await?,
    None => utils::key::gen_host(&state.config.domain),
  };
  let mut job = Job::from_partial(partial, &host, now());
  if let Ok(previous) = state.jobs.read(&job.uuid).await {
    job.created_at = previous.created_at;
  }
  state.jobs.save(&job).await?;
  state.status.restart(&job.uuid);
  log::info!("deploy::redeploy: {} will be routed to {host}", job.uuid);
  dispatch(TaskKind::Redeploy, &job, state).await;
  Ok(job)
}

/// Queue the deploy of a job and log its outcome once known
async fn dispatch(kind: TaskKind, job: &Job, state: &SystemState) {
  let task_job = job.clone();
  let task_state = state.clone();
  let handle = state
    .task_queue
    .dispatch(kind, async move { run(&task_job, &task_state).await })
    .await;
  let job_uuid = job.uuid.clone();
  rt::spawn(async move {
    match handle
      .wait(Duration::from_secs(vars::DEPLOY_WAIT_SECS))
      .await
    {
      Ok(host) => log::info!("deploy::dispatch: {kind} {job_uuid} at {host}"),
      Err(err) => log::warn!("deploy::dispatch: {kind} {job_uuid}: {err}"),
    }
  });
}

/// Deploy a job, a panic inside the flow is turned into an error
pub async fn run(job: &Job, state: &SystemState) -> IoResult<String> {
  match AssertUnwindSafe(deploy(job, state)).catch_unwind().await {
    Ok(res) => res,
    Err(_) => {
      log::error!("deploy::run: {} deploy flow panicked", job.uuid);
      Err(IoError::interrupted(
        "Deploy",
        format!("{} deploy flow panicked", job.uuid),
      ))
    }
  }
}

async fn deploy(job: &Job, state: &SystemState) -> IoResult<String> {
  state
    .status
    .publish(&job.uuid, JobStatus::DownloadingSource);
  let space = state.source.fetch_space(&job.job_source_uri).await?;
  let spec = utils::hardware::parse(space.hardware_description())?;
  // Released when the flow exits, whatever the outcome
  let _slot = spec
    .gpu_model()
    .map(|model| state.gpu_pool.acquire_slot(&model));
  let ctx = DeployContext {
    job_uuid: job.uuid.clone(),
    wallet: space.creator_wallet(),
    workload_uuid: space.workload_uuid(),
    workload_name: space.workload_name(),
    host: job.host_name.clone(),
    ingress_class: state.config.ingress_class.clone(),
  };
  match state
    .builder
    .resolve_workload(&ctx.workload_uuid, &space.data.files)
    .await?
  {
    WorkloadSourceKind::Manifest(path) => {
      let containers = state.builder.parse_manifest(&path).await?;
      let directory = path.parent().unwrap_or_else(|| Path::new("."));
      deployment::deploy_manifest(&ctx, directory, &containers, &spec, state)
        .await?;
    }
    WorkloadSourceKind::Image(context) => {
      let built = state
        .builder
        .build_image(
          &job.uuid,
          &ctx.workload_uuid,
          &ctx.workload_name,
          &context,
        )
        .await?;
      let exposed_port = state
        .builder
        .extract_exposed_port(&built.dockerfile_path)
        .await?;
      let image = ImageWorkload {
        image: built.image,
        dockerfile_path: built.dockerfile_path.display().to_string(),
        exposed_port,
      };
      deployment::deploy_image(&ctx, &image, &spec, state).await?;
    }
  }
  state
    .lease
    .register(
      &job.uuid,
      &ctx.namespace(),
      &ctx.workload_name,
      &ctx.workload_uuid,
      job.duration,
    )
    .await?;
  subsystem::lease_event::spawn(state);
  state
    .jobs
    .update_deployment(&job.uuid, &ctx.host, &ctx.wallet, &ctx.workload_uuid)
    .await?;
  state.status.publish(&job.uuid, JobStatus::ResultUploaded);
  log::info!(
    "deploy::deploy: {} running in {} at {}",
    job.uuid,
    ctx.namespace(),
    ctx.host
  );
  Ok(ctx.host)
}

/// Extend the lease of a running job
pub async fn renew(
  renew: &JobRenew,
  state: &SystemState,
) -> IoResult<JobRenewResponse> {
  match state.lease.renew(&renew.job_uuid, renew.duration).await {
    Ok(record) => Ok(JobRenewResponse {
      status: "success".to_owned(),
      message: None,
      expire_time: Some(record.expire_time),
    }),
    Err(err) if err.is_not_found() => {
      log::info!("deploy::renew: {} rejected: {err}", renew.job_uuid);
      Ok(JobRenewResponse {
        status: "failed".to_owned(),
        message: Some(vars::LEASE_EXPIRED_MSG.to_owned()),
        expire_time: None,
      })
    }
    Err(err) => Err(err),
  }
}

/// Remove the workload of a tenant in the background.
/// The lease is kept, its expiry runs the same teardown again.
pub async fn delete(
  query: &JobDeleteQuery,
  state: &SystemState,
) -> IoResult<()> {
  if query.creator_wallet.trim().is_empty() || query.space_uuid.trim().is_empty()
  {
    return Err(IoError::invalid_input(
      "Job",
      "creator_wallet and space_uuid are required",
    ));
  }
  let namespace = deployment::namespace_name(query.creator_wallet.trim());
  let workload_uuid = query.space_uuid.trim().to_lowercase();
  let task_state = state.clone();
  let handle = state
    .task_queue
    .dispatch(TaskKind::Teardown, async move {
      utils::teardown::run(&namespace, &workload_uuid, &task_state).await
    })
    .await;
  log::info!("deploy::delete: teardown queued as {}", handle.key);
  Ok(())
}
