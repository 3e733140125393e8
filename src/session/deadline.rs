//! Re-armable deadline timers for connection liveness.
//!
//! Each session runs one supervisor task per deadline. The owning actor
//! calls [`Deadline::arm`] whenever liveness is demonstrated (a read
//! completed, a write started); the supervisor sleeps to the current expiry
//! and re-checks on wakeup:
//!
//! ```text
//! wait_until(expiry)
//! if expiry <= now: expired          // nobody re-armed in time
//! else: reschedule for new expiry    // someone re-armed first
//! ```
//!
//! A parked deadline sits at the far future and never fires until armed.
//! Dropping the [`Deadline`] or tripping the session stop signal cancels the
//! supervisor without firing, so a stray expiry can never revive a closed
//! connection.

use tokio::sync::watch;
use tokio::time::{self, Duration, Instant};

/// Expiry used while a deadline is parked.
const PARKED: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Arming side of a deadline. Owned by the session's I/O loops.
#[derive(Debug)]
pub struct Deadline {
    expiry: watch::Sender<Instant>,
}

/// Waiting side of a deadline. Consumed by [`supervise`].
#[derive(Debug)]
pub struct DeadlineWatch {
    expiry: watch::Receiver<Instant>,
}

impl Deadline {
    /// Create a deadline already armed to fire `after` from now.
    pub fn armed(after: Duration) -> (Self, DeadlineWatch) {
        let (tx, rx) = watch::channel(Instant::now() + after);
        (Self { expiry: tx }, DeadlineWatch { expiry: rx })
    }

    /// Create a parked deadline that will not fire until armed.
    pub fn parked() -> (Self, DeadlineWatch) {
        Self::armed(PARKED)
    }

    /// Push the expiry to `now + after`.
    pub fn arm(&self, after: Duration) {
        let _ = self.expiry.send(Instant::now() + after);
    }

    /// Push the expiry to the far future.
    pub fn park(&self) {
        let _ = self.expiry.send(Instant::now() + PARKED);
    }
}

/// Wait on a deadline until it expires or is cancelled.
///
/// Returns `true` if the deadline expired, `false` if it was cancelled
/// first (the [`Deadline`] was dropped or `stop` tripped).
pub(crate) async fn supervise(
    mut watch: DeadlineWatch,
    mut stop: watch::Receiver<bool>,
) -> bool {
    loop {
        let expiry = *watch.expiry.borrow_and_update();
        tokio::select! {
            _ = time::sleep_until(expiry) => {
                // Re-armed between wakeups? Then this was not a timeout.
                if *watch.expiry.borrow() <= Instant::now() {
                    return true;
                }
            }
            changed = watch.expiry.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
            _ = stop.changed() => return false,
        }
    }
}
