use std::ffi::CStr;
use std::io::{Error, ErrorKind};

use libc::{c_char, gethostname};

/// Hostname of the machine running the daemon
pub fn get_hostname() -> std::io::Result<String> {
  let mut name = [0 as c_char; 256];
  let result = unsafe { gethostname(name.as_mut_ptr(), name.len()) };
  if result != 0 {
    return Err(Error::last_os_error());
  }
  let c_str = unsafe { CStr::from_ptr(name.as_ptr()) };
  let hostname = c_str
    .to_str()
    .map_err(|err| Error::new(ErrorKind::InvalidData, err))?;
  Ok(hostname.to_owned())
}
