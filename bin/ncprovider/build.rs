use std::io::{Error, ErrorKind, Result};

/// Set the git commit hash as an environment variable
fn set_env_git_commit_hash() -> Result<()> {
  let git_hash = std::process::Command::new("git")
    .args(["rev-parse", "HEAD"])
    .output()
    .ok()
    .and_then(|output| String::from_utf8(output.stdout).ok())
    .map(|hash| hash.trim().to_owned())
    .filter(|hash| !hash.is_empty())
    .unwrap_or_else(|| "unknown".to_owned());
  println!("cargo:rustc-env=GIT_HASH={git_hash}");
  Ok(())
}

/// Set the target architecture as an environment variable
fn set_env_target_arch() -> Result<()> {
  let arch = std::env::var("CARGO_CFG_TARGET_ARCH")
    .map_err(|e| Error::new(ErrorKind::Other, e))?;
  println!("cargo:rustc-env=TARGET_ARCH={arch}");
  Ok(())
}

fn set_channel() -> Result<()> {
  let channel = std::env::var("NCP_CHANNEL").unwrap_or("stable".into());
  println!("cargo:rustc-env=CHANNEL={channel}");
  Ok(())
}

fn main() -> Result<()> {
  set_channel()?;
  set_env_target_arch()?;
  set_env_git_commit_hash()?;
  Ok(())
}
