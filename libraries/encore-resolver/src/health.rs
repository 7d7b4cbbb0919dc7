//! Consecutive-failure health gate for network providers.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Consecutive transport failures before a provider is benched
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// How long a benched provider stays unavailable
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Tracks recent failures of one provider.
///
/// After `failure_threshold` consecutive failures the provider reports itself
/// unavailable until `cooldown` has elapsed. Any success resets the count.
#[derive(Debug)]
pub struct ProviderHealth {
    name: String,
    failure_threshold: u32,
    cooldown: Duration,
    state: Mutex<HealthState>,
}

#[derive(Debug, Default)]
struct HealthState {
    consecutive_failures: u32,
    benched_at: Option<Instant>,
}

impl ProviderHealth {
    /// Create a gate with the default threshold and cooldown
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_limits(name, DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }

    /// Create a gate with explicit limits
    pub fn with_limits(name: impl Into<String>, failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            cooldown,
            state: Mutex::new(HealthState::default()),
        }
    }

    /// Whether the provider may be called right now
    pub fn is_available(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.benched_at {
            None => true,
            Some(benched_at) if benched_at.elapsed() >= self.cooldown => {
                info!(provider = %self.name, "Provider cooldown elapsed, retrying");
                *state = HealthState::default();
                true
            }
            Some(_) => false,
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = HealthState::default();
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.consecutive_failures += 1;
        if state.benched_at.is_none() && state.consecutive_failures >= self.failure_threshold {
            warn!(
                provider = %self.name,
                failures = state.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Provider marked unavailable"
            );
            state.benched_at = Some(Instant::now());
        }
    }

    /// Current consecutive failure count
    pub fn consecutive_failures(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .consecutive_failures
    }
}
