use ntex::web;
use ntex::http;

/// An http response error
#[derive(Clone, Debug)]
pub struct HttpError {
  pub msg: String,
  pub status: http::StatusCode,
}

pub type HttpResult<T, E = HttpError> = Result<T, E>;

impl HttpError {
  pub fn new<T>(status: http::StatusCode, msg: T) -> Self
  where
    T: ToString,
  {
    Self {
      status,
      msg: msg.to_string(),
    }
  }

  /// Create a new HttpError with status BadRequest - 400
  pub fn bad_request<T>(msg: T) -> Self
  where
    T: ToString,
  {
    Self::new(http::StatusCode::BAD_REQUEST, msg)
  }

  /// Create a new HttpError with status NotFound - 404
  pub fn not_found<T>(msg: T) -> Self
  where
    T: ToString,
  {
    Self::new(http::StatusCode::NOT_FOUND, msg)
  }

  /// Create a new HttpError with status Conflict - 409
  pub fn conflict<T>(msg: T) -> Self
  where
    T: ToString,
  {
    Self::new(http::StatusCode::CONFLICT, msg)
  }

  /// Create a new HttpError with status InternalServerError - 500
  pub fn internal_server_error<T>(msg: T) -> Self
  where
    T: ToString,
  {
    Self::new(http::StatusCode::INTERNAL_SERVER_ERROR, msg)
  }

  pub fn bad_gateway<T>(msg: T) -> Self
  where
    T: ToString,
  {
    Self::new(http::StatusCode::BAD_GATEWAY, msg)
  }

  pub fn gateway_timeout<T>(msg: T) -> Self
  where
    T: ToString,
  {
    Self::new(http::StatusCode::GATEWAY_TIMEOUT, msg)
  }
}

impl std::fmt::Display for HttpError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}] {}", self.status, self.msg)
  }
}

impl std::error::Error for HttpError {}

impl web::WebResponseError for HttpError {
  fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
    let err_json = serde_json::json!({ "msg": self.msg });
    web::HttpResponse::build(self.status).json(&err_json)
  }
}

impl From<crate::io::IoError> for HttpError {
  fn from(err: crate::io::IoError) -> Self {
    match err.inner.kind() {
      std::io::ErrorKind::NotFound => HttpError::not_found(err.to_string()),
      std::io::ErrorKind::AlreadyExists => HttpError::conflict(err.to_string()),
      std::io::ErrorKind::InvalidInput | std::io::ErrorKind::InvalidData => {
        HttpError::bad_request(err.to_string())
      }
      std::io::ErrorKind::ConnectionAborted
      | std::io::ErrorKind::ConnectionRefused => {
        HttpError::bad_gateway(err.to_string())
      }
      std::io::ErrorKind::TimedOut => {
        HttpError::gateway_timeout(err.to_string())
      }
      _ => HttpError::internal_server_error(err.to_string()),
    }
  }
}

impl From<Box<crate::io::IoError>> for HttpError {
  fn from(err: Box<crate::io::IoError>) -> Self {
    (*err).into()
  }
}

impl From<HttpError> for crate::io::IoError {
  fn from(f: HttpError) -> Self {
    Self {
      context: None,
      inner: std::io::Error::new(std::io::ErrorKind::InvalidData, f),
    }
  }
}
