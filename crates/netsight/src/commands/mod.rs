//! Command dispatch: bridges CLI args -> session -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod report;
pub mod seed;
pub mod util;
pub mod view;

use netsight_core::{CoreError, Session, SessionConfig, SweepOutcome, SweepStatus};
use tracing::warn;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: SessionConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(config, args, global).await,
        Command::Report(args) => report::handle(config, args, global).await,
        Command::View(args) => view::handle(config, args, global).await,
        Command::Seed(args) => seed::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

/// Sweep once without live feeds, run `read` against the loaded
/// session, then tear it down.
pub(crate) async fn load<T>(
    config: SessionConfig,
    global: &GlobalOpts,
    read: impl FnOnce(&Session) -> T,
) -> Result<T, CliError> {
    let spinner = util::spinner("Sweeping devices...", global.quiet);

    let result = Session::oneshot(config, |session, outcome| async move {
        Ok::<_, CoreError>((read(&session), outcome))
    })
    .await;
    spinner.finish_and_clear();

    let (value, outcome) = result?;
    check_outcome(&outcome)?;
    Ok(value)
}

/// A sweep that failed before any page arrived is an error; anything
/// else renders what was fetched, with a warning if it stopped early.
pub(crate) fn check_outcome(outcome: &SweepOutcome) -> Result<(), CliError> {
    match &outcome.status {
        SweepStatus::Complete => Ok(()),
        SweepStatus::Failed(err) if outcome.pages == 0 => Err(err.clone().into()),
        SweepStatus::Failed(err) => {
            warn!(pages = outcome.pages, error = %err, "sweep failed, showing partial results");
            Ok(())
        }
        SweepStatus::Truncated { reason } => {
            warn!(pages = outcome.pages, %reason, "sweep truncated, showing partial results");
            Ok(())
        }
        SweepStatus::Cancelled => {
            warn!(pages = outcome.pages, "sweep cancelled");
            Ok(())
        }
    }
}
