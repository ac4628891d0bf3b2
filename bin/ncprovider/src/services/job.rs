use ntex::web;

use ncp_error::http::HttpError;
use ncp_stubs::job::{JobDeleteQuery, JobPartial, JobRenew};

use crate::{models::SystemState, tasks};

/// Receive a job, the deploy continues in the background
#[web::post("/jobs")]
pub(crate) async fn create_job(
  web::types::Json(payload): web::types::Json<JobPartial>,
  state: web::types::State<SystemState>,
) -> Result<web::HttpResponse, HttpError> {
  let job = tasks::deploy::receive(payload, &state).await?;
  Ok(web::HttpResponse::Ok().json(&job))
}

/// Deploy a job again on the host of its previous result
#[web::post("/jobs/redeploy")]
pub(crate) async fn redeploy_job(
  web::types::Json(payload): web::types::Json<JobPartial>,
  state: web::types::State<SystemState>,
) -> Result<web::HttpResponse, HttpError> {
  let job = tasks::deploy::redeploy(payload, &state).await?;
  Ok(web::HttpResponse::Ok().json(&job))
}

#[web::post("/jobs/renew")]
pub(crate) async fn renew_job(
  web::types::Json(payload): web::types::Json<JobRenew>,
  state: web::types::State<SystemState>,
) -> Result<web::HttpResponse, HttpError> {
  let res = tasks::deploy::renew(&payload, &state).await?;
  Ok(web::HttpResponse::Ok().json(&res))
}

/// Remove the workload of a tenant, the lease is kept until it expires
#[web::delete("/jobs")]
pub(crate) async fn delete_job(
  web::types::Query(qs): web::types::Query<JobDeleteQuery>,
  state: web::types::State<SystemState>,
) -> Result<web::HttpResponse, HttpError> {
  tasks::deploy::delete(&qs, &state).await?;
  Ok(web::HttpResponse::Accepted().finish())
}

pub fn ntex_config(config: &mut web::ServiceConfig) {
  config.service(create_job);
  config.service(redeploy_job);
  config.service(renew_job);
  config.service(delete_job);
}
