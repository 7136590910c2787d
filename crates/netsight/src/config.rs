//! CLI configuration: thin wrapper around `netsight_config` shared types.
//!
//! Adds the flag overrides from `GlobalOpts` (--endpoint, --api-key, ...)
//! on top of the profile, then hands off to the shared translation.

use secrecy::SecretString;

use netsight_core::SessionConfig;

use crate::cli::{GlobalOpts, SweepModeArg};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use netsight_config::{
    Config, Profile, config_path, load_config_or_default, profile_to_session_config, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// Build the `SessionConfig` for a data command.
///
/// Flag > env > profile > defaults. Without a profile, `--endpoint`
/// alone is enough.
pub fn build_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let base = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => Profile::default(),
    };

    let profile = apply_overrides(base, global);
    if profile.endpoint.is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }

    let mut session = profile_to_session_config(&profile, &profile_name, &cfg.defaults)?;
    if let Some(ref key) = global.api_key {
        session.api_key = Some(SecretString::from(key.clone()));
    }
    Ok(session)
}

/// Layer the global flags over a profile.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref endpoint) = global.endpoint {
        profile.endpoint.clone_from(endpoint);
    }
    if global.realtime_endpoint.is_some() {
        profile.realtime_endpoint.clone_from(&global.realtime_endpoint);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
    if global.page_size.is_some() {
        profile.page_size = global.page_size;
    }
    if global.max_pages.is_some() {
        profile.max_pages = global.max_pages;
    }
    if global.sweep_budget.is_some() {
        profile.sweep_budget.clone_from(&global.sweep_budget);
    }
    if let Some(mode) = global.sweep_mode {
        profile.sweep_mode = Some(sweep_mode_name(mode).into());
    }
    profile
}

fn sweep_mode_name(mode: SweepModeArg) -> &'static str {
    match mode {
        SweepModeArg::AppendOnly => "append-only",
        SweepModeArg::AppendThenReplace => "append-then-replace",
    }
}
