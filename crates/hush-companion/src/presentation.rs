//! Status/prompt surface consumed by the session. The console
//! implementation is the only shipped one; window/tray front-ends plug in
//! behind the same trait.

use crate::credentials::Credentials;
use crate::session::{ConnectionState, Phase};
use anyhow::{anyhow, Result};
use std::io::{self, BufRead, Write};

pub trait Presentation: Send {
    fn render_status(&self, state: &ConnectionState);
    fn render_counter(&self, count: u64);
    fn render_countdown(&self, secs_remaining: u64);
    /// Prompts for credentials, offering `saved` values as defaults.
    fn prompt_credentials(&self, saved: &Credentials) -> Result<Credentials>;
    fn show_warning(&self, text: &str);
    fn show_fatal(&self, text: &str);
}

pub struct ConsolePresentation;

fn status_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Disconnected => "not connected",
        Phase::Connecting => "connecting...",
        Phase::Connected => "active",
        Phase::Error => "error",
    }
}

impl Presentation for ConsolePresentation {
    fn render_status(&self, state: &ConnectionState) {
        println!("status: {}", status_label(state.phase));
    }

    fn render_counter(&self, count: u64) {
        println!("successful pings: {count}");
    }

    fn render_countdown(&self, secs_remaining: u64) {
        print!("\rnext ping in {secs_remaining:>2}s ");
        let _ = io::stdout().flush();
    }

    fn prompt_credentials(&self, saved: &Credentials) -> Result<Credentials> {
        let api_key = prompt_secret("API key", &saved.api_key)?;
        let operator_id = prompt_line("Operator ID", &saved.operator_id)?;
        if api_key.is_empty() || operator_id.is_empty() {
            return Err(anyhow!("API key and operator id are required"));
        }
        let remember = prompt_yes_no("Remember credentials?", saved.remember)?;
        Ok(Credentials {
            api_key,
            operator_id,
            remember,
        })
    }

    fn show_warning(&self, text: &str) {
        eprintln!("\nwarning: {text}");
    }

    fn show_fatal(&self, text: &str) {
        eprintln!("\nerror: {text}");
    }
}

fn prompt_secret(label: &str, saved: &str) -> Result<String> {
    let hint = if saved.is_empty() { "" } else { " [saved]" };
    let input = rpassword::prompt_password(format!("{label}{hint}: "))?;
    let input = input.trim();
    Ok(if input.is_empty() {
        saved.to_string()
    } else {
        input.to_string()
    })
}

fn prompt_line(label: &str, saved: &str) -> Result<String> {
    if saved.is_empty() {
        print!("{label}: ");
    } else {
        print!("{label} [{saved}]: ");
    }
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let input = input.trim();
    Ok(if input.is_empty() {
        saved.to_string()
    } else {
        input.to_string()
    })
}

fn prompt_yes_no(label: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{label} {hint}: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(match input.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        "n" | "no" => false,
        other => return Err(anyhow!("expected y or n, got '{other}'")),
    })
}
