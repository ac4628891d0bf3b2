use ncp_error::io::{IoError, IoResult};
use ncp_stubs::resource::{ResourceSpec, Specification};

use crate::vars;

const DELIMITER: &str = "·";
const CPU_MARKER: &str = "CPU";

fn parse_field(field: &str, name: &str) -> IoResult<Specification> {
  let tokens = field.split_whitespace().collect::<Vec<_>>();
  let (quantity, unit) = match tokens.as_slice() {
    [_, quantity, unit, ..] => (*quantity, *unit),
    _ => {
      return Err(IoError::invalid_input(
        "Hardware",
        format!("{name} field '{field}' is not `<label> <quantity> <unit>`"),
      ))
    }
  };
  let quantity = quantity.parse::<i64>().map_err(|err| {
    IoError::invalid_input(
      "Hardware",
      format!("{name} quantity '{quantity}' {err}"),
    )
  })?;
  let unit = unit.strip_suffix('B').unwrap_or(unit);
  Ok(Specification::new(quantity, unit))
}

/// Parse a description like `Nvidia RTX 3090 · CPU 8 vCPU · Memory 32 GB`.
///
/// A first field containing `CPU` means no accelerator, otherwise it names
/// the accelerator model. Storage is not parsed and always granted.
pub fn parse(description: &str) -> IoResult<ResourceSpec> {
  if description.trim().is_empty() {
    return Err(IoError::invalid_input(
      "Hardware",
      "empty hardware description",
    ));
  }
  let parts = description.split(DELIMITER).collect::<Vec<_>>();
  if parts.len() < 3 {
    return Err(IoError::invalid_input(
      "Hardware",
      format!("'{description}' has less than 3 fields"),
    ));
  }
  let accelerator = parts[0].trim();
  if accelerator.is_empty() {
    return Err(IoError::invalid_input(
      "Hardware",
      format!("'{description}' names no accelerator"),
    ));
  }
  let gpu = if accelerator.contains(CPU_MARKER) {
    Specification::new(0, "")
  } else {
    Specification::new(1, accelerator.replace("Nvidia", "NVIDIA"))
  };
  let cpu = parse_field(parts[1].trim(), "cpu")?;
  let memory = parse_field(parts[2].trim(), "memory")?;
  Ok(ResourceSpec {
    cpu,
    memory,
    gpu,
    storage: Specification::new(vars::STORAGE_QUANTITY, vars::STORAGE_UNIT),
  })
}
