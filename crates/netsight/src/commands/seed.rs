//! `seed`: push one device through the create mutation.

use serde_json::Value;

use netsight_api::extract_path;
use netsight_core::{DeviceRecord, Session, SessionConfig};

use crate::cli::{GlobalOpts, SeedArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    config: SessionConfig,
    args: SeedArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let input = match args.from_file {
        Some(ref path) => Some(parse_record(util::read_json_file(path)?)?),
        None => None,
    };

    // Seeding needs no sweep; the session stays inactive.
    let session = Session::new(config)?;
    let result = session.seed(input).await?;

    let out = output::render_single(&global.output, &result, summary, created_mac)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Accepts a bare record or a `{"input": {...}}` mutation-variables file.
fn parse_record(value: Value) -> Result<DeviceRecord, CliError> {
    let record = match value {
        Value::Object(mut map) if map.contains_key("input") => {
            map.remove("input").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(record).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("not a device record: {e}"),
    })
}

fn created_mac(result: &Value) -> String {
    extract_path(&["data", "createDevice", "macAddress"], result)
        .and_then(Value::as_str)
        .unwrap_or("-")
        .to_owned()
}

fn summary(result: &Value) -> String {
    let fqdn = extract_path(&["data", "createDevice", "fqdn"], result)
        .and_then(Value::as_str)
        .unwrap_or("-");
    format!("Created device {} ({fqdn})", created_mac(result))
}
