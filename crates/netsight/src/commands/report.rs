//! Inventory summary report.

use std::collections::BTreeMap;

use netsight_core::{DeviceReport, Session, SessionConfig};

use crate::cli::{GlobalOpts, OutputFormat, ReportArgs};
use crate::error::CliError;
use crate::output;

use super::load;

pub async fn handle(
    mut config: SessionConfig,
    args: ReportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.customer.is_some() {
        config.customer_name = args.customer;
    }
    let report = load(config, global, Session::report).await?;

    let out = render_report(&global.output, &report, output::should_color(&global.color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Report in the chosen format; `plain` prints `key=value` lines.
pub(crate) fn render_report(
    format: &OutputFormat,
    report: &DeviceReport,
    color: bool,
) -> Result<String, CliError> {
    output::render_single(format, report, |r| detail(r, color), plain)
}

fn detail(r: &DeviceReport, color: bool) -> String {
    let title = r
        .customer_name
        .as_deref()
        .map_or_else(|| "Device report".to_owned(), |name| format!("Device report: {name}"));

    let mut lines = vec![
        output::heading(&title, color),
        format!("Devices:          {}", r.total_devices),
        format!("Distinct MACs:    {}", r.distinct_macs),
        format!("IoT endpoints:    {}", r.iot_endpoints),
        format!("With alarms:      {}", r.devices_with_alarms),
        format!("Total alarms:     {}", r.total_alarms),
        format!(
            "Unknown (mean):   {:.1}%",
            r.completeness.mean_unknown_ratio * 100.0
        ),
    ];
    if let Some(ref best) = r.completeness.most_complete {
        lines.push(format!(
            "Most complete:    {} ({}/{} attributes known)",
            best.key, best.known, best.total
        ));
    }

    push_counts(&mut lines, "By category", &r.by_category, color);
    push_counts(&mut lines, "By OS type", &r.by_os_type, color);
    lines.join("\n")
}

fn push_counts(lines: &mut Vec<String>, title: &str, counts: &BTreeMap<String, usize>, color: bool) {
    if counts.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(output::heading(title, color));
    let width = counts.keys().map(String::len).max().unwrap_or(0);
    // largest bucket first
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (name, count) in sorted {
        lines.push(format!("  {name:<width$}  {count}"));
    }
}

fn plain(r: &DeviceReport) -> String {
    [
        format!("total_devices={}", r.total_devices),
        format!("distinct_macs={}", r.distinct_macs),
        format!("iot_endpoints={}", r.iot_endpoints),
        format!("devices_with_alarms={}", r.devices_with_alarms),
        format!("total_alarms={}", r.total_alarms),
    ]
    .join("\n")
}
