//! `view <path>`: resolve an in-app route against a freshly swept
//! snapshot and render it.

use serde_json::json;

use netsight_core::{Route, Session, SessionConfig, View};

use crate::cli::{GlobalOpts, OutputFormat, ViewArgs};
use crate::error::CliError;
use crate::output;

use super::devices::{render_detail, render_devices};
use super::load;
use super::report::render_report;

pub async fn handle(
    config: SessionConfig,
    args: ViewArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let route = Route::parse(&args.path);
    tracing::debug!(route = %route, "resolving view");

    let view = load(config, global, |s: &Session| s.view(route)).await?;
    let out = render_view(&global.output, view, output::should_color(&global.color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn render_view(format: &OutputFormat, view: View, color: bool) -> Result<String, CliError> {
    match view {
        View::Home { total_devices } => render_home(format, total_devices, color),
        View::DeviceList(devices) => render_devices(format, &devices),
        View::DeviceDetail(device) => render_detail(format, &device, color),
        View::Report(report) => render_report(format, &report, color),
        View::DeviceMissing(mac) => Err(CliError::NotFound {
            resource_type: "device".into(),
            identifier: mac.to_string(),
            list_command: "view /devices".into(),
        }),
        View::NotFound(path) => Err(CliError::NotFound {
            resource_type: "route".into(),
            identifier: path,
            list_command: "view /".into(),
        }),
    }
}

fn render_home(format: &OutputFormat, total_devices: usize, color: bool) -> Result<String, CliError> {
    let summary = json!({
        "totalDevices": total_devices,
        "routes": [
            Route::Devices.path(),
            Route::Report.path(),
        ],
    });
    output::render_single(
        format,
        &summary,
        |_| {
            [
                output::heading("netsight", color),
                format!("{total_devices} devices loaded"),
                String::new(),
                format!("  {:<10} {}", Route::Devices.path(), output::dim("device table", color)),
                format!("  {:<10} {}", "/devices/<mac>", output::dim("device detail", color)),
                format!("  {:<10} {}", Route::Report.path(), output::dim("summary report", color)),
            ]
            .join("\n")
        },
        |_| total_devices.to_string(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use netsight_core::view::EMPTY_PLACEHOLDER;
    use netsight_core::{MacAddress, ViewState};

    use super::*;

    #[test]
    fn unknown_route_is_not_found() {
        let view = ViewState::new(Route::parse("/nowhere"), Arc::new(Vec::new())).resolve();
        let err = render_view(&OutputFormat::Table, view, false).unwrap_err();
        assert!(matches!(err, CliError::NotFound { ref resource_type, .. } if resource_type == "route"));
    }

    #[test]
    fn missing_device_is_not_found() {
        let view = View::DeviceMissing(MacAddress::new("aa:bb"));
        let err = render_view(&OutputFormat::Table, view, false).unwrap_err();
        assert_eq!(err.to_string(), "device 'AA:BB' not found");
    }

    #[test]
    fn empty_list_shows_placeholder() {
        let view = View::DeviceList(Arc::new(Vec::new()));
        let out = render_view(&OutputFormat::Table, view, false).unwrap();
        assert_eq!(out, EMPTY_PLACEHOLDER);
    }

    #[test]
    fn home_counts_devices() {
        let out = render_view(&OutputFormat::Plain, View::Home { total_devices: 7 }, false).unwrap();
        assert_eq!(out, "7");

        let table = render_view(&OutputFormat::Table, View::Home { total_devices: 7 }, false).unwrap();
        assert!(table.contains("7 devices loaded"));
        assert!(table.contains("/report"));
    }
}
