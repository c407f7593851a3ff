//! The idle reaper: evicts sessions that have gone silent.

use std::sync::Arc;
use std::time::Duration;

use palaver_session::SessionRegistry;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Notice delivered to a session evicted for inactivity.
const INACTIVITY_NOTICE: &str =
    "You have been disconnected due to inactivity.";

/// Configuration for the idle reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often the registry is swept.
    pub sweep_interval: Duration,

    /// How long a session may go without activity before it is evicted.
    pub idle_timeout: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(20 * 60),
        }
    }
}

/// Background task that periodically terminates idle sessions.
///
/// Runs independently of every connection task; there are no per-read
/// timeouts anywhere, the reaper is what bounds a silent session's life.
pub struct IdleReaper {
    registry: Arc<SessionRegistry>,
    config: ReaperConfig,
}

impl IdleReaper {
    /// Creates a reaper over the given registry.
    pub fn new(registry: Arc<SessionRegistry>, config: ReaperConfig) -> Self {
        Self { registry, config }
    }

    /// Runs the sweep loop forever. Spawn this on its own task.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            idle_secs = self.config.idle_timeout.as_secs(),
            "idle reaper running"
        );

        let start = Instant::now() + self.config.sweep_interval;
        let mut ticker = time::interval_at(start, self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.sweep();
        }
    }

    /// Sweeps the registry once, returning how many sessions were evicted.
    ///
    /// Works on a snapshot; a session concurrently terminated by another
    /// trigger (client `/exit`, kick, transport error) is counted by
    /// whichever caller won the idempotent terminate.
    pub fn sweep(&self) -> usize {
        let mut evicted = 0;
        for session in self.registry.sessions() {
            if session.idle_for() > self.config.idle_timeout {
                session.send(INACTIVITY_NOTICE);
                if session.terminate(&self.registry) {
                    evicted += 1;
                    tracing::info!(
                        id = %session.id(),
                        name = ?session.display_name(),
                        "session evicted for inactivity"
                    );
                }
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use palaver_session::{Outbound, Session};
    use palaver_store::{RoleKind, User, UserId};
    use palaver_transport::ConnectionId;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn reaper_with_timeout(
        registry: &Arc<SessionRegistry>,
        idle_timeout: Duration,
    ) -> IdleReaper {
        IdleReaper::new(
            Arc::clone(registry),
            ReaperConfig {
                sweep_interval: Duration::from_secs(60),
                idle_timeout,
            },
        )
    }

    fn registered(
        registry: &Arc<SessionRegistry>,
        id: u64,
        name: &str,
    ) -> (Arc<Session>, UnboundedReceiver<Outbound>) {
        let (session, rx) = Session::new(ConnectionId::new(id));
        session.begin_authenticating();
        let user =
            User::new(UserId(id), name, "secret123", name, [RoleKind::User])
                .into_shared();
        registry.subscribe(&session, user).unwrap();
        (session, rx)
    }

    #[test]
    fn test_sweep_evicts_sessions_past_the_threshold() {
        // Zero threshold: any elapsed time counts as idle.
        let registry = Arc::new(SessionRegistry::new());
        let reaper = reaper_with_timeout(&registry, Duration::ZERO);
        let (session, mut rx) = registered(&registry, 1, "alice");

        let evicted = reaper.sweep();

        assert_eq!(evicted, 1);
        assert!(session.is_terminated());
        assert!(registry.active_names().is_empty());

        let first = rx.try_recv().unwrap();
        assert_eq!(first, Outbound::Line(INACTIVITY_NOTICE.into()));
    }

    #[test]
    fn test_sweep_spares_sessions_within_the_threshold() {
        let registry = Arc::new(SessionRegistry::new());
        let reaper = reaper_with_timeout(&registry, Duration::from_secs(3600));
        let (session, _rx) = registered(&registry, 1, "alice");
        session.touch();

        let evicted = reaper.sweep();

        assert_eq!(evicted, 0);
        assert!(!session.is_terminated());
        assert_eq!(registry.active_names(), ["alice"]);
    }

    #[test]
    fn test_sweep_tolerates_concurrent_termination() {
        // The session exits by itself right before the sweep runs; the
        // idempotent terminate means the reaper simply counts nothing.
        let registry = Arc::new(SessionRegistry::new());
        let reaper = reaper_with_timeout(&registry, Duration::ZERO);
        let (session, _rx) = registered(&registry, 1, "alice");

        session.terminate(&registry);

        let evicted = reaper.sweep();

        assert_eq!(evicted, 0);
        assert!(session.is_terminated());
    }

    #[test]
    fn test_sweep_on_empty_registry_is_a_no_op() {
        let registry = Arc::new(SessionRegistry::new());
        let reaper = reaper_with_timeout(&registry, Duration::ZERO);
        assert_eq!(reaper.sweep(), 0);
    }
}
