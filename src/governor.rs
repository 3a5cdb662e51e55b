use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{GovernorError, StoreError};

/// Width of the sliding request window.
pub const RATE_WINDOW: Duration = Duration::from_secs(300);

/// Service-protection allowance per window.
pub const WINDOW_CAPACITY: usize = 6000;

/// How a governed call reacts to rate-limit responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// First backoff delay, doubled on every retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following the given zero-based attempt.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Lifecycle of the call most recently driven through the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    /// A request is out, with its zero-based attempt number.
    InFlight { attempt: u32 },
    /// Backing off after a rate-limit response.
    Retrying { attempt: u32 },
    Succeeded,
    Failed,
}

/// What one governed request did, folded into the lifetime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestOutcome {
    /// Wall time the call itself took.
    pub duration: Duration,
    /// Whether the store answered with a retryable rate status.
    pub rate_limited: bool,
    /// Retries this request charged against the policy.
    pub retries: u32,
    /// Backoff enforced after the response.
    pub waited: Duration,
}

#[derive(Debug)]
struct GovernorState {
    created: Instant,
    requests: VecDeque<Instant>,
    call_state: CallState,
    total_requests: u64,
    rate_limited: u64,
    total_retries: u64,
    total_waited: Duration,
    quota_failures: u64,
}

impl Default for GovernorState {
    fn default() -> Self {
        GovernorState {
            created: Instant::now(),
            requests: VecDeque::new(),
            call_state: CallState::Idle,
            total_requests: 0,
            rate_limited: 0,
            total_retries: 0,
            total_waited: Duration::ZERO,
            quota_failures: 0,
        }
    }
}

impl GovernorState {
    /// Drops requests at least [`RATE_WINDOW`] old.
    fn prune(&mut self, reference: Instant) {
        while let Some(&oldest) = self.requests.front() {
            if reference.duration_since(oldest) >= RATE_WINDOW {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }

    fn record(&mut self, now: Instant, outcome: RequestOutcome) {
        self.prune(now);
        self.requests.push_back(now);
        self.total_requests += 1;
        if outcome.rate_limited {
            self.rate_limited += 1;
        }
        self.total_retries += u64::from(outcome.retries);
        self.total_waited += outcome.waited;
    }
}

/// Paces every request a process sends to a flow store.
///
/// The governor counts requests inside a sliding [`RATE_WINDOW`] and drives
/// rate-limited calls through exponential backoff. Cloning the handle shares
/// the underlying window, so one governor can sit in front of any number of
/// concurrent callers.
#[derive(Debug, Clone)]
pub struct RateGovernor {
    policy: RetryPolicy,
    shared: Arc<Mutex<GovernorState>>,
}

impl Default for RateGovernor {
    fn default() -> Self {
        RateGovernor::new()
    }
}

impl RateGovernor {
    pub fn new() -> Self {
        RateGovernor::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        RateGovernor {
            policy,
            shared: Arc::new(Mutex::new(GovernorState::default())),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, GovernorState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one request at the current instant with its outcome.
    pub fn record_request(&self, outcome: RequestOutcome) {
        self.lock().record(Instant::now(), outcome);
    }

    /// Requests still inside the window, pruned against the current instant.
    pub fn requests_in_window(&self) -> usize {
        let mut state = self.lock();
        state.prune(Instant::now());
        state.requests.len()
    }

    /// Requests that would still be inside the window at `reference`.
    ///
    /// Does not prune, so a caller can probe a future reference point
    /// without disturbing the recorded history.
    pub fn requests_in_window_at(&self, reference: Instant) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|&&at| at <= reference && reference.duration_since(at) < RATE_WINDOW)
            .count()
    }

    /// Lifecycle state of the most recent governed call.
    pub fn call_state(&self) -> CallState {
        self.lock().call_state
    }

    /// Snapshot of window usage and lifetime counters.
    pub fn summary(&self) -> RateSummary {
        let now = Instant::now();
        let mut state = self.lock();
        state.prune(now);
        RateSummary {
            in_window: state.requests.len(),
            capacity: WINDOW_CAPACITY,
            total_requests: state.total_requests,
            rate_limited: state.rate_limited,
            total_retries: state.total_retries,
            total_waited: state.total_waited,
            quota_failures: state.quota_failures,
            elapsed: now.duration_since(state.created),
        }
    }

    /// Drives one store call through the retry state machine.
    ///
    /// Rate-limit responses back off exponentially, honoring any server
    /// hint when it is longer, and retry up to the policy's limit before
    /// failing with [`GovernorError::QuotaExceeded`]. Any other store error
    /// fails immediately. `label` names the call in logs and errors.
    pub fn run<T>(
        &self,
        label: &str,
        mut call: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, GovernorError> {
        let mut attempt = 0;
        let mut waited = Duration::ZERO;
        loop {
            self.lock().call_state = CallState::InFlight { attempt };
            let issued = Instant::now();
            let result = call();
            let duration = issued.elapsed();
            match result {
                Ok(value) => {
                    let mut state = self.lock();
                    state.record(
                        Instant::now(),
                        RequestOutcome {
                            duration,
                            ..RequestOutcome::default()
                        },
                    );
                    state.call_state = CallState::Succeeded;
                    return Ok(value);
                }
                Err(StoreError::RateLimited { retry_after })
                    if attempt < self.policy.max_retries =>
                {
                    let mut delay = self.policy.backoff_delay(attempt);
                    if let Some(hint) = retry_after {
                        delay = delay.max(hint);
                    }
                    {
                        let mut state = self.lock();
                        state.record(
                            Instant::now(),
                            RequestOutcome {
                                duration,
                                rate_limited: true,
                                retries: 1,
                                waited: delay,
                            },
                        );
                        state.call_state = CallState::Retrying { attempt };
                    }
                    debug!(
                        label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    // Never sleep while holding the lock.
                    thread::sleep(delay);
                    waited += delay;
                    attempt += 1;
                }
                Err(StoreError::RateLimited { .. }) => {
                    let mut state = self.lock();
                    state.record(
                        Instant::now(),
                        RequestOutcome {
                            duration,
                            rate_limited: true,
                            ..RequestOutcome::default()
                        },
                    );
                    state.call_state = CallState::Failed;
                    state.quota_failures += 1;
                    drop(state);
                    warn!(label, attempts = attempt + 1, "request quota exhausted");
                    return Err(GovernorError::QuotaExceeded {
                        label: label.to_string(),
                        attempts: attempt + 1,
                        waited,
                    });
                }
                Err(source) => {
                    let mut state = self.lock();
                    state.record(
                        Instant::now(),
                        RequestOutcome {
                            duration,
                            ..RequestOutcome::default()
                        },
                    );
                    state.call_state = CallState::Failed;
                    drop(state);
                    return Err(GovernorError::CallFailed {
                        label: label.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

/// Point-in-time view of governor usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSummary {
    pub in_window: usize,
    pub capacity: usize,
    pub total_requests: u64,
    /// Requests the store rejected with a retryable rate status.
    pub rate_limited: u64,
    pub total_retries: u64,
    /// Backoff enforced across every governed call.
    pub total_waited: Duration,
    pub quota_failures: u64,
    /// Wall time since the governor was created.
    pub elapsed: Duration,
}

impl RateSummary {
    /// Share of the window allowance in use, in percent.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.in_window as f64 / self.capacity as f64 * 100.0
    }

    /// Requests left before the window allowance is exhausted.
    pub fn headroom(&self) -> usize {
        self.capacity.saturating_sub(self.in_window)
    }

    /// Mean request rate over the governor's lifetime, per minute.
    pub fn requests_per_minute(&self) -> f64 {
        let minutes = self.elapsed.as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        self.total_requests as f64 / minutes
    }
}

impl fmt::Display for RateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} requests in the last {}s ({:.1}% of quota); \
             {} total, {} rate limited, {} retries, {} quota failures, \
             {:.2}s enforced wait over {:.0}s",
            self.in_window,
            self.capacity,
            RATE_WINDOW.as_secs(),
            self.utilization(),
            self.total_requests,
            self.rate_limited,
            self.total_retries,
            self.quota_failures,
            self.total_waited.as_secs_f64(),
            self.elapsed.as_secs_f64()
        )
    }
}
