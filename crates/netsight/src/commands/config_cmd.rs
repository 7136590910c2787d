//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking the API key.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "page_size = {}", cfg.defaults.page_size);
    let _ = writeln!(out, "max_pages = {}", cfg.defaults.max_pages);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "endpoint = \"{}\"", p.endpoint);
        if let Some(ref rt) = p.realtime_endpoint {
            let _ = writeln!(out, "realtime_endpoint = \"{rt}\"");
        }
        if p.api_key.is_some() {
            let _ = writeln!(out, "api_key = \"****\"");
        }
        if let Some(ref env) = p.api_key_env {
            let _ = writeln!(out, "api_key_env = \"{env}\"");
        }
        if let Some(ref customer) = p.customer_name {
            let _ = writeln!(out, "customer_name = \"{customer}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(page_size) = p.page_size {
            let _ = writeln!(out, "page_size = {page_size}");
        }
        if let Some(max_pages) = p.max_pages {
            let _ = writeln!(out, "max_pages = {max_pages}");
        }
        if let Some(ref budget) = p.sweep_budget {
            let _ = writeln!(out, "sweep_budget = \"{budget}\"");
        }
        if let Some(ref mode) = p.sweep_mode {
            let _ = writeln!(out, "sweep_mode = \"{mode}\"");
        }
        if let Some(live) = p.live_feeds {
            let _ = writeln!(out, "live_feeds = {live}");
        }
    }

    out
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

fn invalid(field: &str, reason: &str) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Apply one `config set` key to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "endpoint" => profile.endpoint = value,
        "realtime_endpoint" | "realtime-endpoint" => profile.realtime_endpoint = Some(value),
        "api_key" | "api-key" => profile.api_key = Some(value),
        "api_key_env" | "api-key-env" => profile.api_key_env = Some(value),
        "customer_name" | "customer-name" => profile.customer_name = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => {
            profile.insecure = Some(
                value
                    .parse()
                    .map_err(|_| invalid("insecure", "must be 'true' or 'false'"))?,
            );
        }
        "live_feeds" | "live-feeds" => {
            profile.live_feeds = Some(
                value
                    .parse()
                    .map_err(|_| invalid("live_feeds", "must be 'true' or 'false'"))?,
            );
        }
        "timeout" => {
            profile.timeout = Some(
                value
                    .parse()
                    .map_err(|_| invalid("timeout", "must be a number (seconds)"))?,
            );
        }
        "page_size" | "page-size" => {
            profile.page_size = Some(
                value
                    .parse()
                    .map_err(|_| invalid("page_size", "must be a positive number"))?,
            );
        }
        "max_pages" | "max-pages" => {
            profile.max_pages = Some(
                value
                    .parse()
                    .map_err(|_| invalid("max_pages", "must be a positive number"))?,
            );
        }
        "sweep_budget" | "sweep-budget" => {
            humantime::parse_duration(&value)
                .map_err(|e| invalid("sweep_budget", &e.to_string()))?;
            profile.sweep_budget = Some(value);
        }
        "sweep_mode" | "sweep-mode" => {
            if !matches!(value.as_str(), "append-only" | "append-then-replace") {
                return Err(invalid(
                    "sweep_mode",
                    "must be 'append-only' or 'append-then-replace'",
                ));
            }
            profile.sweep_mode = Some(value);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: endpoint, realtime_endpoint, \
                     api_key, api_key_env, customer_name, ca_cert, insecure, live_feeds, \
                     timeout, page_size, max_pages, sweep_budget, sweep_mode"
                ),
            });
        }
    }
    Ok(())
}

fn prompt_api_key() -> Result<String, CliError> {
    let key = Password::new()
        .with_prompt("API key")
        .interact()
        .map_err(prompt_err)?;
    if key.is_empty() {
        return Err(invalid("api_key", "API key cannot be empty"));
    }
    Ok(key)
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("netsight configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let endpoint: String = Input::new()
                .with_prompt("GraphQL endpoint URL")
                .validate_with(|input: &String| -> Result<(), String> {
                    url::Url::parse(input)
                        .map(|_| ())
                        .map_err(|e| format!("invalid URL: {e}"))
                })
                .interact_text()
                .map_err(prompt_err)?;

            let customer: String = Input::new()
                .with_prompt("Customer name (optional)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let key = prompt_api_key()?;
            let choices = &[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
            ];
            let selection = Select::new()
                .with_prompt("Where to store the API key?")
                .items(choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let api_key = if selection == 0 {
                netsight_config::store_api_key(&profile_name, &key)?;
                eprintln!("   API key stored in system keyring");
                None
            } else {
                Some(key)
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    endpoint,
                    api_key,
                    customer_name: Some(customer).filter(|c| !c.is_empty()),
                    ..Profile::default()
                },
            );
            cfg.default_profile = Some(profile_name.clone());
            config::save_config(&cfg)?;

            eprintln!("\nConfiguration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: netsight devices list --limit 10");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                config::config_path().display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: netsight config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("Default profile set to '{name}'");
            Ok(())
        }

        // ── SetKey ──────────────────────────────────────────────────
        ConfigCommand::SetKey { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let key = prompt_api_key()?;
            netsight_config::store_api_key(&profile_name, &key)?;
            eprintln!("API key stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
