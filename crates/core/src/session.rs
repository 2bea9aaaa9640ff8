//! Reconnection state machine for a client session.
//!
//! [`ReconnectMachine`] owns the connection state and retry counter. It is
//! fed [`SessionEvent`]s and answers with the [`SessionAction`]s the driver
//! must perform (open a socket, arm a timer, record a log line). It never
//! sleeps or touches the network, so every transition is testable without
//! timers.

use std::fmt;
use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first automatic retry.
    pub base_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Automatic retries allowed before giving up.
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            max_retries: 10,
        }
    }
}

/// Delay before retry attempt `attempt` (1-based).
///
/// `min(base * 2^(attempt - 1), max)`. Attempt 0 is treated as attempt 1.
pub fn backoff_delay(attempt: u32, policy: &ReconnectPolicy) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << exponent;
    policy
        .base_delay
        .checked_mul(factor)
        .unwrap_or(policy.max_delay)
        .min(policy.max_delay)
}

/// Connection state of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Automatic retries exhausted; only a manual reconnect leaves this state.
    GaveUp,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::GaveUp => "Gave up",
        };
        f.write_str(label)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session was created.
    Mount,
    /// The user asked to reconnect.
    ManualReconnect,
    /// The channel opened.
    Opened,
    /// The channel closed, failed to open, or reported a transport error.
    Closed { code: u16 },
    /// The scheduled retry delay elapsed.
    RetryElapsed,
}

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a new channel and report `Opened` or `Closed`.
    Connect,
    /// Close the currently open channel without reporting `Closed`.
    CloseChannel,
    /// Drop any pending retry timer.
    CancelRetry,
    /// Arm the retry timer and report `RetryElapsed` when it fires.
    ScheduleRetry(Duration),
    /// Fetch the run status from the control service.
    PollStatus,
    StartHeartbeat,
    StopHeartbeat,
    /// Append a line to the session log.
    RecordLog(String),
}

/// The reconnection state machine.
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    retry_count: u32,
    retry_pending: bool,
    policy: ReconnectPolicy,
}

impl ReconnectMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_count: 0,
            retry_pending: false,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether an automatic retry is armed.
    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Apply `event` and return the actions to perform, in order.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        use ConnectionState::*;

        match (self.state, event) {
            (Disconnected, SessionEvent::Mount) => {
                self.state = Connecting;
                vec![SessionAction::Connect]
            }

            (state, SessionEvent::ManualReconnect) => {
                let mut actions = vec![SessionAction::CancelRetry];
                if matches!(state, Connected | Connecting) {
                    actions.push(SessionAction::StopHeartbeat);
                    actions.push(SessionAction::CloseChannel);
                }
                self.retry_count = 0;
                self.retry_pending = false;
                self.state = Connecting;
                actions.push(SessionAction::RecordLog("Reconnecting...".to_string()));
                actions.push(SessionAction::Connect);
                actions.push(SessionAction::PollStatus);
                actions
            }

            (Connecting, SessionEvent::Opened) => {
                self.state = Connected;
                self.retry_count = 0;
                vec![
                    SessionAction::RecordLog("Connected to log stream".to_string()),
                    SessionAction::PollStatus,
                    SessionAction::StartHeartbeat,
                ]
            }

            (Connecting | Connected, SessionEvent::Closed { code }) => {
                self.state = Disconnected;
                self.retry_count += 1;

                let mut actions = vec![
                    SessionAction::StopHeartbeat,
                    SessionAction::RecordLog(format!(
                        "Disconnected from log stream (code {code})"
                    )),
                ];

                if self.retry_count > self.policy.max_retries {
                    self.state = GaveUp;
                    actions.push(SessionAction::RecordLog(format!(
                        "Gave up reconnecting after {} attempts; reconnect manually",
                        self.policy.max_retries
                    )));
                } else {
                    let delay = backoff_delay(self.retry_count, &self.policy);
                    self.retry_pending = true;
                    actions.push(SessionAction::RecordLog(format!(
                        "Retrying in {} ms (attempt {}/{})",
                        delay.as_millis(),
                        self.retry_count,
                        self.policy.max_retries
                    )));
                    actions.push(SessionAction::ScheduleRetry(delay));
                }

                actions
            }

            (Disconnected, SessionEvent::RetryElapsed) if self.retry_pending => {
                self.retry_pending = false;
                self.state = Connecting;
                vec![SessionAction::Connect]
            }

            // Duplicate closes, stale timers and opens after a manual close
            // carry no new information.
            _ => Vec::new(),
        }
    }
}

impl Default for ReconnectMachine {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduled_delay(actions: &[SessionAction]) -> Option<Duration> {
        actions.iter().find_map(|a| match a {
            SessionAction::ScheduleRetry(d) => Some(*d),
            _ => None,
        })
    }

    /// Drive the machine from a fresh mount into `Connecting`.
    fn mounted() -> ReconnectMachine {
        let mut m = ReconnectMachine::default();
        assert_eq!(m.handle(SessionEvent::Mount), vec![SessionAction::Connect]);
        m
    }

    #[test]
    fn backoff_doubles_from_one_second() {
        let policy = ReconnectPolicy::default();
        assert_eq!(backoff_delay(1, &policy), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2, &policy), Duration::from_millis(2000));
        assert_eq!(backoff_delay(3, &policy), Duration::from_millis(4000));
    }

    #[test]
    fn backoff_clamps_at_max() {
        let policy = ReconnectPolicy::default();
        assert_eq!(backoff_delay(6, &policy), Duration::from_secs(30));
        assert_eq!(backoff_delay(40, &policy), Duration::from_secs(30));
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = ReconnectPolicy::default();
        let expected = [1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000, 30000, 30000];

        for (n, &ms) in (1u32..).zip(expected.iter()) {
            let formula = (1000u64 * 2u64.pow(n - 1)).min(30_000);
            assert_eq!(formula, ms);
            assert_eq!(backoff_delay(n, &policy), Duration::from_millis(ms));
        }
    }

    #[test]
    fn open_resets_counter_and_polls_status() {
        let mut m = mounted();
        m.handle(SessionEvent::Closed { code: 1006 });
        m.handle(SessionEvent::RetryElapsed);
        assert_eq!(m.retry_count(), 1);

        let actions = m.handle(SessionEvent::Opened);

        assert_eq!(m.state(), ConnectionState::Connected);
        assert_eq!(m.retry_count(), 0);
        assert!(actions.contains(&SessionAction::PollStatus));
        assert!(actions.contains(&SessionAction::StartHeartbeat));
    }

    #[test]
    fn close_records_code_and_schedules_backoff() {
        let mut m = mounted();
        m.handle(SessionEvent::Opened);

        let actions = m.handle(SessionEvent::Closed { code: 1001 });

        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.retry_count(), 1);
        assert!(actions.contains(&SessionAction::StopHeartbeat));
        assert!(actions.iter().any(
            |a| matches!(a, SessionAction::RecordLog(msg) if msg.contains("code 1001"))
        ));
        assert_eq!(scheduled_delay(&actions), Some(Duration::from_secs(1)));
        assert!(m.retry_pending());
    }

    #[test]
    fn duplicate_close_counts_once() {
        let mut m = mounted();
        m.handle(SessionEvent::Opened);
        m.handle(SessionEvent::Closed { code: 1006 });

        assert!(m.handle(SessionEvent::Closed { code: 1006 }).is_empty());
        assert_eq!(m.retry_count(), 1);
    }

    #[test]
    fn gives_up_after_ten_failed_attempts() {
        let mut m = mounted();
        let mut delays = Vec::new();

        // Initial connection drops, then every retry fails.
        loop {
            let actions = m.handle(SessionEvent::Closed { code: 1006 });
            match scheduled_delay(&actions) {
                Some(d) => {
                    delays.push(d.as_millis() as u64);
                    assert_eq!(m.handle(SessionEvent::RetryElapsed), vec![SessionAction::Connect]);
                }
                None => break,
            }
        }

        assert_eq!(delays.len(), 10);
        assert_eq!(delays[..6], [1000, 2000, 4000, 8000, 16000, 30000]);
        assert_eq!(m.state(), ConnectionState::GaveUp);
        assert!(!m.retry_pending());

        // Nothing brings it back automatically.
        assert!(m.handle(SessionEvent::RetryElapsed).is_empty());
        assert!(m.handle(SessionEvent::Closed { code: 1006 }).is_empty());
        assert!(m.handle(SessionEvent::Mount).is_empty());
        assert_eq!(m.state(), ConnectionState::GaveUp);
    }

    #[test]
    fn manual_reconnect_leaves_gave_up() {
        let mut m = mounted();
        for _ in 0..=10 {
            m.handle(SessionEvent::Closed { code: 1006 });
            m.handle(SessionEvent::RetryElapsed);
        }
        assert_eq!(m.state(), ConnectionState::GaveUp);

        let actions = m.handle(SessionEvent::ManualReconnect);

        assert_eq!(m.state(), ConnectionState::Connecting);
        assert_eq!(m.retry_count(), 0);
        assert!(actions.contains(&SessionAction::Connect));
        assert!(actions.contains(&SessionAction::PollStatus));
        assert!(!actions.contains(&SessionAction::CloseChannel));
    }

    #[test]
    fn manual_reconnect_cancels_pending_retry() {
        let mut m = mounted();
        m.handle(SessionEvent::Closed { code: 1006 });
        assert!(m.retry_pending());

        let actions = m.handle(SessionEvent::ManualReconnect);

        assert_eq!(actions[0], SessionAction::CancelRetry);
        assert!(!m.retry_pending());
        // The stale timer firing afterwards is ignored.
        m.handle(SessionEvent::Opened);
        assert!(m.handle(SessionEvent::RetryElapsed).is_empty());
    }

    #[test]
    fn manual_reconnect_while_connected_closes_first() {
        let mut m = mounted();
        m.handle(SessionEvent::Opened);

        let actions = m.handle(SessionEvent::ManualReconnect);

        let close = actions
            .iter()
            .position(|a| *a == SessionAction::CloseChannel)
            .expect("close the open channel");
        let connect = actions
            .iter()
            .position(|a| *a == SessionAction::Connect)
            .expect("connect again");
        assert!(close < connect);
    }

    #[test]
    fn manual_reconnect_is_idempotent() {
        let mut a = mounted();
        let mut b = mounted();

        a.handle(SessionEvent::ManualReconnect);
        b.handle(SessionEvent::ManualReconnect);
        b.handle(SessionEvent::ManualReconnect);

        assert_eq!(a.state(), b.state());
        assert_eq!(a.retry_count(), b.retry_count());
        assert_eq!(a.retry_pending(), b.retry_pending());
    }
}
