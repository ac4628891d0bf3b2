use rand::{distributions::Uniform, Rng};

use crate::vars;

const HOST_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random lower case alphanumeric prefix
pub fn gen_prefix(len: usize) -> String {
  let range = Uniform::from(0..HOST_CHARSET.len());
  rand::thread_rng()
    .sample_iter(range)
    .take(len)
    .map(|index| HOST_CHARSET[index] as char)
    .collect()
}

/// Join a prefix to the provider domain.
/// A domain starting with a dot is appended as is.
pub fn join_host(prefix: &str, domain: &str) -> String {
  if domain.starts_with('.') {
    format!("{prefix}{domain}")
  } else {
    format!("{prefix}.{domain}")
  }
}

/// Generate a fresh public host under `domain`
pub fn gen_host(domain: &str) -> String {
  join_host(&gen_prefix(vars::HOST_PREFIX_LEN), domain)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn host_format() {
    let host = gen_host(".provider.test");
    let (prefix, domain) = host.split_at(vars::HOST_PREFIX_LEN);
    assert_eq!(domain, ".provider.test");
    assert!(prefix
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    assert_eq!(
      join_host("abcdefghij", "provider.test"),
      "abcdefghij.provider.test"
    );
  }

  #[test]
  fn hosts_differ() {
    assert_ne!(gen_prefix(10), gen_prefix(10));
  }
}
