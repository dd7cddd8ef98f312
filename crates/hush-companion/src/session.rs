//! Connection state machine and the cooperative scheduler that drives it.
//!
//! Transitions live on [`ConnectionState`] as synchronous methods so they
//! can be exercised without a runtime; [`Session::run`] is the single task
//! that owns the timers, so a countdown tick can never interleave with a
//! ping's state transition.

use crate::api_client::PingTransport;
use crate::credentials::{self, Credentials};
use crate::presentation::Presentation;
use anyhow::Result;
use hush_core::config::CompanionConfig;
use hush_core::vault::CredentialVault;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub phase: Phase,
    pub retry_count: u32,
    pub successful_pings: u64,
    pub countdown_secs: u64,
    interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Below the retry ceiling: warn and keep the timer running.
    Transient,
    /// Ceiling reached: force a disconnect and surface a fatal dialog.
    Terminal,
}

impl ConnectionState {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            phase: Phase::Disconnected,
            retry_count: 0,
            successful_pings: 0,
            countdown_secs: interval_secs,
            interval_secs,
        }
    }

    pub fn begin_connect(&mut self) {
        self.phase = Phase::Connecting;
    }

    pub fn connect_succeeded(&mut self) {
        self.phase = Phase::Connected;
        self.countdown_secs = self.interval_secs;
    }

    /// The first, user-initiated attempt does not consume a retry.
    pub fn connect_failed(&mut self) {
        self.phase = Phase::Error;
    }

    /// A successful ping clears the failure history.
    pub fn ping_succeeded(&mut self) {
        self.phase = Phase::Connected;
        self.successful_pings += 1;
        self.retry_count = 0;
        self.countdown_secs = self.interval_secs;
    }

    pub fn ping_failed(&mut self, max_retries: u32) -> FailureKind {
        self.phase = Phase::Error;
        self.retry_count += 1;
        if self.retry_count >= max_retries {
            FailureKind::Terminal
        } else {
            FailureKind::Transient
        }
    }

    pub fn disconnect(&mut self) {
        *self = Self::new(self.interval_secs);
    }

    pub fn tick_countdown(&mut self) {
        self.countdown_secs = self.countdown_secs.saturating_sub(1);
    }
}

pub struct Session<T: PingTransport, P: Presentation> {
    transport: T,
    presentation: P,
    config: CompanionConfig,
    vault: CredentialVault,
    credentials_path: PathBuf,
    credentials: Credentials,
    state: ConnectionState,
    ping_in_flight: bool,
}

impl<T: PingTransport, P: Presentation> Session<T, P> {
    pub fn new(
        transport: T,
        presentation: P,
        config: CompanionConfig,
        vault: CredentialVault,
        credentials_path: PathBuf,
        credentials: Credentials,
    ) -> Self {
        let interval_secs = config.ping_interval.as_secs();
        Self {
            transport,
            presentation,
            config,
            vault,
            credentials_path,
            credentials,
            state: ConnectionState::new(interval_secs),
            ping_in_flight: false,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Runs until the connection ends: terminal ping failure, a failed
    /// first attempt, or ctrl-c. Persists credentials on the way out when
    /// "remember" is set.
    pub async fn run(&mut self) -> Result<()> {
        self.state.begin_connect();
        self.presentation.render_status(&self.state);
        match self
            .transport
            .send_ping(&self.credentials.api_key, &self.credentials.operator_id)
            .await
        {
            Ok(()) => {
                self.state.connect_succeeded();
                self.presentation.render_status(&self.state);
                info!("connected");
                if self.credentials.remember {
                    self.persist_credentials();
                }
            }
            Err(err) => {
                // No retry loop yet; the user decides whether to try again.
                self.state.connect_failed();
                self.presentation.render_status(&self.state);
                self.presentation
                    .show_warning(&format!("Connection failed: {err}"));
                return Ok(());
            }
        }

        let period = self.config.ping_interval;
        let mut ping_timer = interval_at(Instant::now() + period, period);
        ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let tick = Duration::from_secs(1);
        let mut countdown_timer = interval_at(Instant::now() + tick, tick);
        countdown_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ping_timer.tick() => {
                    if self.periodic_ping().await.is_break() {
                        break;
                    }
                }
                _ = countdown_timer.tick() => {
                    self.state.tick_countdown();
                    self.presentation.render_countdown(self.state.countdown_secs);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("disconnect requested");
                    self.state.disconnect();
                    self.presentation.render_status(&self.state);
                    break;
                }
            }
        }

        if self.credentials.remember {
            self.persist_credentials();
        }
        Ok(())
    }

    async fn periodic_ping(&mut self) -> ControlFlow<()> {
        // A tick that lands while a ping is still in flight is dropped. The
        // interval is validated to be longer than the request timeout, so
        // this is a guard, not an expected path.
        if self.ping_in_flight {
            warn!("previous ping still in flight, skipping tick");
            return ControlFlow::Continue(());
        }
        self.ping_in_flight = true;
        let outcome = self
            .transport
            .send_ping(&self.credentials.api_key, &self.credentials.operator_id)
            .await;
        self.ping_in_flight = false;

        match outcome {
            Ok(()) => {
                self.state.ping_succeeded();
                self.presentation.render_status(&self.state);
                self.presentation.render_counter(self.state.successful_pings);
                ControlFlow::Continue(())
            }
            Err(err) => match self.state.ping_failed(self.config.max_retries) {
                FailureKind::Transient => {
                    warn!(error = %err, attempt = self.state.retry_count, "ping failed");
                    self.presentation.render_status(&self.state);
                    self.presentation.show_warning(&format!(
                        "Ping {}/{} failed: {err}",
                        self.state.retry_count, self.config.max_retries
                    ));
                    ControlFlow::Continue(())
                }
                FailureKind::Terminal => {
                    error!(error = %err, attempts = self.config.max_retries, "connection lost");
                    self.presentation.show_fatal(&format!(
                        "Connection ended after {} attempts: {err}",
                        self.config.max_retries
                    ));
                    self.state.disconnect();
                    self.presentation.render_status(&self.state);
                    ControlFlow::Break(())
                }
            },
        }
    }

    fn persist_credentials(&self) {
        if let Err(err) =
            credentials::save(&self.vault, &self.credentials_path, &self.credentials)
        {
            warn!(error = %err, "failed to persist credentials");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_disconnected_with_zeroed_counters() {
        let state = ConnectionState::new(15);
        assert_eq!(state.phase, Phase::Disconnected);
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.successful_pings, 0);
        assert_eq!(state.countdown_secs, 15);
    }

    #[test]
    fn first_connect_failure_consumes_no_retry() {
        let mut state = ConnectionState::new(15);
        state.begin_connect();
        assert_eq!(state.phase, Phase::Connecting);
        state.connect_failed();
        assert_eq!(state.phase, Phase::Error);
        assert_eq!(state.retry_count, 0);
    }

    #[test]
    fn three_failures_reach_the_terminal_ceiling() {
        let mut state = ConnectionState::new(15);
        state.begin_connect();
        state.connect_succeeded();
        assert_eq!(state.ping_failed(3), FailureKind::Transient);
        assert_eq!(state.ping_failed(3), FailureKind::Transient);
        assert_eq!(state.ping_failed(3), FailureKind::Terminal);
        assert_eq!(state.phase, Phase::Error);
    }

    #[test]
    fn a_success_resets_the_retry_counter() {
        let mut state = ConnectionState::new(15);
        state.begin_connect();
        state.connect_succeeded();
        state.ping_failed(3);
        assert_eq!(state.retry_count, 1);
        state.ping_succeeded();
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.successful_pings, 1);
        assert_eq!(state.phase, Phase::Connected);
    }

    #[test]
    fn disconnect_resets_everything() {
        let mut state = ConnectionState::new(15);
        state.begin_connect();
        state.connect_succeeded();
        state.ping_succeeded();
        state.ping_failed(3);
        state.disconnect();
        assert_eq!(state, ConnectionState::new(15));
    }

    #[test]
    fn countdown_saturates_at_zero() {
        let mut state = ConnectionState::new(1);
        state.tick_countdown();
        state.tick_countdown();
        assert_eq!(state.countdown_secs, 0);
        state.ping_succeeded();
        assert_eq!(state.countdown_secs, 1);
    }
}
