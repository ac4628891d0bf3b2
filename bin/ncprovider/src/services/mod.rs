use ntex::web;

use ncp_error::http::HttpError;

mod job;
mod system;

pub async fn unhandled() -> Result<web::HttpResponse, HttpError> {
  Err(HttpError {
    status: ntex::http::StatusCode::NOT_FOUND,
    msg: "Route or method unhandled".into(),
  })
}

pub fn ntex_config(config: &mut web::ServiceConfig) {
  job::ntex_config(config);
  system::ntex_config(config);
}
