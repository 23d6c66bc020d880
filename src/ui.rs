// UI layer: credential prompts, a spinner while the upstream is queried, and
// rendering of the final reading. All network work is delegated to `client`.

use crate::client::LibreLinkUpClient;
use crate::config::Args;
use crate::connections::{ByPatientId, ConnectionSelector, FirstConnection};
use crate::error::ErrorKind;
use crate::reading::Reading;
use crate::session::Credentials;
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Printed once when the follower has no connection; the error itself only
/// names the condition.
pub const SHARING_HINT: &str =
    "Share data from the LibreLink app to this LibreLinkUp account, then accept the invite in LibreLinkUp.";

/// Run the whole flow once and print the result.
pub fn run(args: &Args) -> Result<()> {
    let credentials = resolve_credentials(args)?;
    let client = LibreLinkUpClient::new(args.client_config()).context("Failed to build HTTP client")?;

    let selector: Box<dyn ConnectionSelector> = match &args.patient_id {
        Some(id) => Box::new(ByPatientId(id.clone())),
        None => Box::new(FirstConnection),
    };

    let spinner = spinner("Logging in...");
    let result = client.negotiate(&credentials).and_then(|session| {
        spinner.set_message("Looking up connections...");
        let patient_id = client.find_patient(&session, selector.as_ref())?;
        spinner.set_message("Fetching latest reading...");
        client.fetch_latest(&session, &patient_id).map(|r| (session, r))
    });
    spinner.finish_and_clear();

    match result {
        Ok((session, reading)) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reading)?);
            } else {
                println!("Base URL: {}  (version header {})", session.base_url(), session.version_header());
                println!("{}", summary(&reading));
            }
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NoConnection => {
            eprintln!("{}", SHARING_HINT.yellow());
            Err(e.into())
        }
        Err(e) => {
            if e.kind() == ErrorKind::Protocol {
                tracing::warn!("Upstream left the known login paths; the LibreLinkUp API may have changed");
            }
            Err(e.into())
        }
    }
}

/// Credentials from args/env, falling back to interactive prompts.
fn resolve_credentials(args: &Args) -> Result<Credentials> {
    let email = match args.email.as_deref().filter(|e| !e.is_empty()) {
        Some(email) => email.to_string(),
        None => Input::new()
            .with_prompt("LibreLinkUp email")
            .interact_text()
            .context("Reading email")?,
    };
    // `Password` hides input in terminal for passwords.
    let password = match args.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => password.to_string(),
        None => Password::new()
            .with_prompt("LibreLinkUp password")
            .interact()
            .context("Reading password")?,
    };
    Ok(Credentials::new(email, password))
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// One-line summary, e.g. `Latest: 123 rising at 2026-01-31 10:42:00 UTC`.
pub fn summary(reading: &Reading) -> String {
    let value = format!("{}", reading.value);
    let value = if reading.is_low {
        value.red().to_string()
    } else if reading.is_high {
        value.yellow().to_string()
    } else {
        value
    };
    format!(
        "Latest: {} {} at {}",
        value,
        reading.trend.label,
        reading.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
