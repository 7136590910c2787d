//! Device command handlers.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;
use tokio::time::Instant;

use netsight_core::format::{display_or_dash, is_unknown_sentinel, relative_or_dash};
use netsight_core::view::EMPTY_PLACEHOLDER;
use netsight_core::{Device, DeviceFilter, MacAddress, Reading, Session, SessionConfig};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{check_outcome, load, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "FQDN")]
    fqdn: String,
    #[tabled(rename = "Alarms")]
    alarms: String,
    #[tabled(rename = "IoT")]
    iot: String,
    #[tabled(rename = "OS")]
    os: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "First Seen")]
    first_seen: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl From<&Arc<Device>> for DeviceRow {
    fn from(d: &Arc<Device>) -> Self {
        Self {
            mac: display_or_dash(&d.mac),
            ip: ip_cell(d),
            description: display_or_dash(&d.description),
            fqdn: display_or_dash(&d.fqdn),
            alarms: display_or_dash(&d.alarm_count),
            iot: display_or_dash(&d.iot_endpoint),
            os: display_or_dash(&d.os_type),
            score: display_or_dash(&d.classification_score),
            first_seen: relative_or_dash(&d.first_seen),
            last_seen: relative_or_dash(&d.last_seen),
        }
    }
}

/// IP plus "updated <ago>" when the backend says when it changed.
fn ip_cell(d: &Device) -> String {
    match (&d.ip, &d.last_ip_update) {
        (Reading::Known(ip), Reading::Known(_)) => {
            format!("{ip} (updated {})", relative_or_dash(&d.last_ip_update))
        }
        (ip, _) => display_or_dash(ip),
    }
}

/// One `--field` projection result.
#[derive(Serialize)]
struct FieldValue {
    mac: String,
    value: Value,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&FieldValue> for FieldRow {
    fn from(f: &FieldValue) -> Self {
        Self {
            mac: f.mac.clone(),
            value: value_cell(&f.value),
        }
    }
}

/// One line of the compact list.
#[derive(Serialize)]
struct CompactEntry {
    index: usize,
    mac: String,
    fqdn: String,
}

// ── Helpers ─────────────────────────────────────────────────────────

fn device_id(d: &Arc<Device>) -> String {
    d.key().unwrap_or("-").to_owned()
}

/// Printable form of a raw attribute: strings unquoted, unknowns as `-`.
fn value_cell(value: &Value) -> String {
    if is_unknown_sentinel(value) {
        return "-".into();
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Walk a dot-separated attribute path on one device.
fn project(device: &Device, path: &str) -> Value {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return Value::Null;
    };
    let rest: Vec<&str> = segments.collect();
    device
        .attribute(first)
        .and_then(|root| netsight_api::extract_path(&rest, root))
        .cloned()
        .unwrap_or(Value::Null)
}

fn parse_filters(raw: &[String]) -> Result<Vec<DeviceFilter>, CliError> {
    raw.iter()
        .map(|f| {
            f.parse::<DeviceFilter>().map_err(|e| CliError::Validation {
                field: "filter".into(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn select(
    devices: &[Arc<Device>],
    filters: &[DeviceFilter],
    limit: Option<usize>,
) -> Vec<Arc<Device>> {
    devices
        .iter()
        .filter(|d| filters.iter().all(|f| f.matches(d)))
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

fn compact_entries(devices: &[Arc<Device>]) -> Vec<CompactEntry> {
    devices
        .iter()
        .enumerate()
        .map(|(i, d)| CompactEntry {
            index: i + 1,
            mac: display_or_dash(&d.mac),
            fqdn: display_or_dash(&d.fqdn),
        })
        .collect()
}

fn compact_lines(entries: &[CompactEntry]) -> String {
    if entries.is_empty() {
        return EMPTY_PLACEHOLDER.to_owned();
    }
    entries
        .iter()
        .map(|e| format!("{:>4}. {:<17}  {}", e.index, e.mac, e.fqdn))
        .collect::<Vec<_>>()
        .join("\n")
}

fn detail(d: &Arc<Device>, color: bool) -> String {
    let completeness = d.completeness();
    let mut lines = vec![
        output::heading(&format!("Device {}", display_or_dash(&d.mac)), color),
        format!("IP:           {}", ip_cell(d)),
        format!("FQDN:         {}", display_or_dash(&d.fqdn)),
        format!("Description:  {}", display_or_dash(&d.description)),
        format!("Category:     {}", display_or_dash(&d.category)),
        format!(
            "OS:           {} {}",
            display_or_dash(&d.os_type),
            d.os_version.known().map_or("", String::as_str)
        )
        .trim_end()
        .to_owned(),
        format!("Manufacturer: {}", display_or_dash(&d.manufacturer)),
        format!("IoT:          {}", display_or_dash(&d.iot_endpoint)),
        format!("Alarms:       {}", display_or_dash(&d.alarm_count)),
        format!("Score:        {}", display_or_dash(&d.classification_score)),
        format!("Risk:         {}", display_or_dash(&d.risk_score)),
        format!("First Seen:   {}", relative_or_dash(&d.first_seen)),
        format!("Last Seen:    {}", relative_or_dash(&d.last_seen)),
        format!(
            "Known:        {}/{} attributes",
            completeness.known, completeness.total
        ),
    ];
    if !d.tags.is_empty() {
        lines.push(format!("Tags:         {}", d.tags.join(", ")));
    }

    lines.push(String::new());
    lines.push(output::heading("Attributes", color));
    let width = d.attributes.keys().map(String::len).max().unwrap_or(0);
    for (name, value) in &d.attributes {
        let cell = value_cell(value);
        let cell = if is_unknown_sentinel(value) {
            output::dim(&cell, color)
        } else {
            cell
        };
        lines.push(format!("  {name:<width$}  {cell}"));
    }
    lines.join("\n")
}

/// Single-line form used by `watch`.
fn event_line(d: &Arc<Device>) -> String {
    format!(
        "+ {}  {}  {}  {}",
        display_or_dash(&d.mac),
        ip_cell(d),
        display_or_dash(&d.fqdn),
        display_or_dash(&d.description)
    )
}

// ── Shared renderers (also used by `view`) ──────────────────────────

/// Device table, or the placeholder when a table would be empty.
pub(crate) fn render_devices(
    format: &OutputFormat,
    devices: &[Arc<Device>],
) -> Result<String, CliError> {
    if devices.is_empty() && matches!(format, OutputFormat::Table) {
        return Ok(EMPTY_PLACEHOLDER.to_owned());
    }
    output::render_list(format, devices, |d| DeviceRow::from(d), device_id)
}

pub(crate) fn render_detail(
    format: &OutputFormat,
    device: &Arc<Device>,
    color: bool,
) -> Result<String, CliError> {
    output::render_single(format, device, |d| detail(d, color), device_id)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: SessionConfig,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        DevicesCommand::List {
            filter,
            limit,
            field,
        } => {
            let filters = parse_filters(&filter)?;
            let devices = load(config, global, |s| {
                select(&s.devices_snapshot(), &filters, limit)
            })
            .await?;

            let out = if let Some(path) = field {
                let values: Vec<FieldValue> = devices
                    .iter()
                    .map(|d| FieldValue {
                        mac: device_id(d),
                        value: project(d, &path),
                    })
                    .collect();
                output::render_list(
                    &global.output,
                    &values,
                    |f| FieldRow::from(f),
                    |f| value_cell(&f.value),
                )?
            } else {
                render_devices(&global.output, &devices)?
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Compact => {
            let devices = load(config, global, Session::devices_snapshot).await?;
            let entries = compact_entries(&devices);
            let out = output::render_single(
                &global.output,
                entries.as_slice(),
                compact_lines,
                |e| e.iter().map(|c| c.mac.clone()).collect::<Vec<_>>().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { mac } => {
            let wanted = MacAddress::new(&mac);
            let device = load(config, global, |s| s.device_by_mac(&wanted))
                .await?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "device".into(),
                    identifier: mac,
                    list_command: "devices list".into(),
                })?;
            let out = render_detail(&global.output, &device, color)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Watch { duration, filter } => {
            let filter = match filter {
                Some(raw) => parse_filters(&[raw])?.pop().unwrap_or(DeviceFilter::All),
                None => DeviceFilter::All,
            };
            watch(config, duration.map(Duration::from_secs), &filter, global).await
        }
    }
}

// ── Watch ───────────────────────────────────────────────────────────

/// Sweep with live feeds on, then print devices as they are appended
/// until the duration elapses or Ctrl-C.
async fn watch(
    config: SessionConfig,
    duration: Option<Duration>,
    filter: &DeviceFilter,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let session = Session::new(config)?;
    session.activate().await?;

    let result = follow(&session, duration, filter, global).await;
    session.deactivate().await;
    result
}

async fn follow(
    session: &Session,
    duration: Option<Duration>,
    filter: &DeviceFilter,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let spinner = util::spinner("Sweeping devices...", global.quiet);
    let outcome = session.wait_for_sweep().await;
    spinner.finish_and_clear();
    check_outcome(&outcome?)?;

    let mut stream = session.devices()?;
    let mut seen = stream.latest().len();
    if !global.quiet {
        eprintln!("{seen} devices loaded, watching for changes...");
    }

    let deadline = duration.map(|d| Instant::now() + d);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = until(deadline) => break,
            changed = stream.changed() => {
                let Some(snapshot) = changed else { break };
                // A replacing sweep shrank the collection; start over.
                if snapshot.len() < seen {
                    seen = 0;
                }
                for device in snapshot.iter().skip(seen).filter(|d| filter.matches(d)) {
                    print_event(device, &global.output)?;
                }
                seen = snapshot.len();
            }
        }
    }
    Ok(())
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn print_event(device: &Arc<Device>, format: &OutputFormat) -> Result<(), CliError> {
    let line = match format {
        OutputFormat::Table => event_line(device),
        OutputFormat::Plain => device_id(device),
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(device, true)?,
        OutputFormat::Yaml => format!("---\n{}", output::render_yaml(device)?),
    };
    output::print_output(&line, false);
    Ok(())
}
