#[derive(Debug)]
pub struct IoError {
  pub context: Option<String>,
  pub inner: std::io::Error,
}

impl Clone for IoError {
  fn clone(&self) -> Self {
    Self {
      context: self.context.clone(),
      inner: std::io::Error::new(self.inner.kind(), self.inner.to_string()),
    }
  }
}

impl IoError {
  pub fn new<T>(context: T, inner: std::io::Error) -> Self
  where
    T: Into<String>,
  {
    Self {
      context: Some(context.into()),
      inner,
    }
  }

  fn with_kind<C, M>(context: C, kind: std::io::ErrorKind, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::new(
      context.to_string(),
      std::io::Error::new(kind, message.to_string()),
    )
  }

  pub fn invalid_data<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::InvalidData, message)
  }

  pub fn invalid_input<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::InvalidInput, message)
  }

  pub fn not_found<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::NotFound, message)
  }

  pub fn already_exists<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::AlreadyExists, message)
  }

  pub fn interrupted<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::Interrupted, message)
  }

  pub fn timed_out<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::TimedOut, message)
  }

  pub fn context(&self) -> Option<&str> {
    self.context.as_deref()
  }

  pub fn kind(&self) -> std::io::ErrorKind {
    self.inner.kind()
  }

  /// Cluster deletes and lookups treat a missing object as success
  pub fn is_not_found(&self) -> bool {
    self.inner.kind() == std::io::ErrorKind::NotFound
  }

  pub fn is_already_exists(&self) -> bool {
    self.inner.kind() == std::io::ErrorKind::AlreadyExists
  }

  pub fn into_inner(self) -> std::io::Error {
    self.inner
  }

  pub fn exit(&self) -> ! {
    std::process::exit(self.inner.raw_os_error().unwrap_or(1));
  }

  pub fn print_and_exit(&self) -> ! {
    log::error!("{self}");
    self.exit()
  }
}

impl std::fmt::Display for IoError {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> Result<(), std::fmt::Error> {
    use std::io::ErrorKind::*;

    let mut message;
    let message = if self.inner.raw_os_error().is_some() {
      // Normalize OS messages and drop the "(os error X)" suffix
      match self.inner.kind() {
        NotFound => "No such file or directory",
        PermissionDenied => "Permission denied",
        ConnectionRefused => "Connection refused",
        ConnectionReset => "Connection reset",
        ConnectionAborted => "Connection aborted",
        NotConnected => "Not connected",
        AddrInUse => "Address in use",
        AddrNotAvailable => "Address not available",
        BrokenPipe => "Broken pipe",
        AlreadyExists => "Already exists",
        InvalidInput => "Invalid input",
        InvalidData => "Invalid data",
        TimedOut => "Timed out",
        Interrupted => "Interrupted",
        UnexpectedEof => "Unexpected end of file",
        _ => {
          message = strip_errno(&self.inner);
          capitalize(&mut message);
          &message
        }
      }
    } else {
      message = self.inner.to_string();
      capitalize(&mut message);
      &message
    };
    if let Some(ctx) = &self.context {
      write!(f, "{ctx}: {message}")
    } else {
      write!(f, "{message}")
    }
  }
}

impl std::error::Error for IoError {}

fn capitalize(text: &mut str) {
  if let Some(first) = text.get_mut(..1) {
    first.make_ascii_uppercase();
  }
}

fn strip_errno(err: &std::io::Error) -> String {
  let mut msg = err.to_string();
  if let Some(pos) = msg.find(" (os error ") {
    msg.truncate(pos);
  }
  msg
}

pub type IoResult<T, E = IoError> = Result<T, E>;

/// Conversion from foreign errors into [`IoError`] with a context
pub trait FromIo<T> {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> T
  where
    C: ToString + std::fmt::Display;
}

impl FromIo<IoError> for IoError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> IoError
  where
    C: ToString + std::fmt::Display,
  {
    IoError {
      context: Some((context)().to_string()),
      inner: self.into_inner(),
    }
  }
}

impl FromIo<Box<IoError>> for std::io::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner: self,
    })
  }
}

impl From<Box<IoError>> for IoError {
  fn from(f: Box<IoError>) -> Self {
    *f
  }
}

impl From<std::io::Error> for IoError {
  fn from(f: std::io::Error) -> Self {
    Self {
      context: None,
      inner: f,
    }
  }
}

impl From<IoError> for std::io::Error {
  fn from(f: IoError) -> Self {
    f.inner
  }
}

#[cfg(feature = "serde_json")]
impl FromIo<Box<IoError>> for serde_json::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner: std::io::Error::new(std::io::ErrorKind::InvalidData, self),
    })
  }
}

#[cfg(feature = "serde_yaml")]
impl FromIo<Box<IoError>> for serde_yaml::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner: std::io::Error::new(std::io::ErrorKind::InvalidInput, self),
    })
  }
}

#[cfg(feature = "bollard")]
impl FromIo<Box<IoError>> for bollard_next::errors::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    let kind = match &self {
      bollard_next::errors::Error::DockerResponseServerError {
        status_code: 404,
        ..
      } => std::io::ErrorKind::NotFound,
      bollard_next::errors::Error::DockerResponseServerError {
        status_code: 409,
        ..
      } => std::io::ErrorKind::AlreadyExists,
      _ => std::io::ErrorKind::Other,
    };
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner: std::io::Error::new(kind, self),
    })
  }
}

#[cfg(feature = "kube")]
impl FromIo<Box<IoError>> for kube::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    let kind = match &self {
      kube::Error::Api(res) if res.code == 404 => std::io::ErrorKind::NotFound,
      kube::Error::Api(res) if res.code == 409 => {
        std::io::ErrorKind::AlreadyExists
      }
      kube::Error::Api(_) => std::io::ErrorKind::InvalidData,
      _ => std::io::ErrorKind::ConnectionAborted,
    };
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner: std::io::Error::new(kind, self),
    })
  }
}

#[cfg(feature = "redis")]
impl FromIo<Box<IoError>> for redis::RedisError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    let kind = if self.is_connection_refusal() {
      std::io::ErrorKind::ConnectionRefused
    } else if self.is_timeout() {
      std::io::ErrorKind::TimedOut
    } else if self.is_connection_dropped() {
      std::io::ErrorKind::ConnectionAborted
    } else {
      std::io::ErrorKind::Other
    };
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner: std::io::Error::new(kind, self),
    })
  }
}

#[cfg(feature = "ntex")]
impl FromIo<Box<IoError>> for ntex::http::client::error::SendRequestError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    let msg = self.to_string();
    let kind = match &self {
      ntex::http::client::error::SendRequestError::Timeout => {
        std::io::ErrorKind::TimedOut
      }
      ntex::http::client::error::SendRequestError::Connect(
        ntex::http::client::error::ConnectError::Disconnected(_),
      ) => std::io::ErrorKind::ConnectionAborted,
      ntex::http::client::error::SendRequestError::Connect(_) => {
        std::io::ErrorKind::ConnectionRefused
      }
      _ => std::io::ErrorKind::Interrupted,
    };
    let inner = std::io::Error::new(kind, msg);
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner,
    })
  }
}

#[cfg(feature = "ntex")]
impl FromIo<Box<IoError>> for ntex::http::client::error::JsonPayloadError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner: std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{self}"),
      ),
    })
  }
}

#[cfg(feature = "ntex")]
impl FromIo<Box<IoError>> for ntex::http::error::PayloadError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some((context)().to_string()),
      inner: std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{self}"),
      ),
    })
  }
}
