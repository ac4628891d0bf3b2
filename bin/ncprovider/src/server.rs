use ntex::web;
use ntex_cors::Cors;

use crate::{models::SystemState, services, vars};

/// Generate the http server bound to every configured host.
/// Hosts are `tcp://<addr>` or `unix://<path>`.
pub async fn gen(state: SystemState) -> std::io::Result<ntex::server::Server> {
  log::info!("server::gen: preparing server");
  let hosts = state.config.hosts.clone();
  let mut server = web::HttpServer::new(move || {
    web::App::new()
      .state(state.clone())
      .state(web::types::JsonConfig::default().limit(vars::MAX_JSON_PAYLOAD))
      .wrap(Cors::new().finish())
      .configure(services::ntex_config)
      .default_service(web::route().to(services::unhandled))
  });
  for host in &hosts {
    if let Some(addr) = host.strip_prefix("unix://") {
      server = match server.bind_uds(addr) {
        Err(err) => {
          log::error!("server::gen: unable to bind unix socket {addr}: {err}");
          return Err(err);
        }
        Ok(server) => server,
      };
    } else if let Some(addr) = host.strip_prefix("tcp://") {
      server = match server.bind(addr) {
        Err(err) => {
          log::error!("server::gen: unable to bind tcp host {addr}: {err}");
          return Err(err);
        }
        Ok(server) => server,
      };
    } else {
      log::error!("server::gen: {host} is not valid use tcp:// or unix://");
      return Err(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        "Invalid protocol use tcp:// or unix://",
      ));
    }
    log::info!("server::gen: listening on {host}");
  }
  log::info!("server::gen: server ready");
  Ok(server.run())
}
