//! Command-line driver
//!
//! Owns the browser session for the whole run, prints the start and end
//! banners, and hands the step list to the runner.

use std::io::Write;

use clap::Parser;

use crate::browser::{ChromeSession, Session};
use crate::common::config::{Config, Environment};
use crate::common::Result;
use crate::testing::{scenario, RunSummary, Step, StepRunner, FAILURE_BANNER, SUCCESS_BANNER};

/// Smoke test for a running Discourse forum
///
/// Takes exactly one or two positional arguments and no flags, so anything
/// starting with a hyphen is an ordinary argument.
#[derive(Parser, Debug)]
#[command(
    name = "smoke-test",
    long_about = None,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    /// Base URL of the forum, e.g. http://localhost:3000
    #[arg(allow_hyphen_values = true)]
    pub url: String,

    /// Accepted and ignored
    #[arg(hide = true, allow_hyphen_values = true)]
    pub extra: Option<String>,
}

/// Run the whole smoke test against `args.url`
pub async fn run(args: Args) -> Result<()> {
    let mut runner = StepRunner::stdout();
    runner.say(&format!("Starting Discourse Smoke Test for {}", args.url));

    let outcome = launch_and_drive(&mut runner, &args.url).await;
    if let Err(e) = &outcome {
        // Step failures have already been reported by `drive`
        if !e.is_step_outcome() {
            runner.say(FAILURE_BANNER);
        }
    }
    outcome.map(|_| ())
}

async fn launch_and_drive<W: Write>(runner: &mut StepRunner<W>, url: &str) -> Result<RunSummary> {
    let env = Environment::from_env();
    let config = Config::load()?;
    let steps = scenario::steps(url, &env);

    tracing::info!(steps = steps.len(), readonly = env.readonly, "Prepared scenario");

    let mut session = ChromeSession::launch(&config).await?;
    drive(runner, &mut session, &steps).await
}

/// Run `steps` on `session`, print the closing banner and release the session
///
/// On failure the failed step's line is followed directly by the failure
/// banner; closing the session afterwards is best effort.
pub async fn drive<W, S>(
    runner: &mut StepRunner<W>,
    session: &mut S,
    steps: &[Step],
) -> Result<RunSummary>
where
    W: Write,
    S: Session + ?Sized,
{
    match runner.run(session, steps).await {
        Ok(summary) => {
            session.close().await?;
            tracing::info!(
                steps = summary.steps_run,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "Smoke test finished"
            );
            runner.say(SUCCESS_BANNER);
            Ok(summary)
        }
        Err(e) => {
            runner.say(FAILURE_BANNER);
            if let Err(close_err) = session.close().await {
                tracing::warn!(error = %close_err, "Failed to close browser session");
            }
            Err(e)
        }
    }
}
