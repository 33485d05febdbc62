//! A monotonic deadline with three modes, matching §5's "infinite,
//! non-blocking, finite" trio (Testable Property 6).

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
enum Mode {
    Infinite,
    NonBlocking,
    Finite { duration: Duration, target: Instant },
}

/// A deadline constructed once and polled repeatedly. `time_left` guards
/// against a backwards clock jump by recomputing the target if the observed
/// remaining span exceeds the original duration - that can only happen if
/// `Instant::now()` moved backwards relative to when the deadline started.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    mode: Mode,
}

impl Deadline {
    pub fn infinite() -> Self {
        Self { mode: Mode::Infinite }
    }

    pub fn non_blocking() -> Self {
        Self { mode: Mode::NonBlocking }
    }

    pub fn finite(duration: Duration) -> Self {
        Self {
            mode: Mode::Finite {
                duration,
                target: Instant::now() + duration,
            },
        }
    }

    /// `None` duration means infinite, `Some(Duration::ZERO)` means
    /// non-blocking - mirrors the constructor accepted by the reference
    /// implementation's `Timeout(duration)`.
    pub fn from_option(duration: Option<Duration>) -> Self {
        match duration {
            None => Self::infinite(),
            Some(d) if d.is_zero() => Self::non_blocking(),
            Some(d) => Self::finite(d),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self.mode, Mode::Infinite)
    }

    pub fn is_non_blocking(&self) -> bool {
        matches!(self.mode, Mode::NonBlocking)
    }

    /// Remaining time, or `None` for an infinite deadline. Always `Some(d)`
    /// with `d >= Duration::ZERO` for a finite one.
    pub fn time_left(&mut self) -> Option<Duration> {
        match &mut self.mode {
            Mode::Infinite => None,
            Mode::NonBlocking => Some(Duration::ZERO),
            Mode::Finite { duration, target } => {
                let now = Instant::now();
                if *target > now {
                    let left = *target - now;
                    if left > *duration {
                        // clock jumped backwards; recompute from now
                        *target = now + *duration;
                        Some(*duration)
                    } else {
                        Some(left)
                    }
                } else {
                    Some(Duration::ZERO)
                }
            }
        }
    }

    pub fn expired(&mut self) -> bool {
        matches!(self.time_left(), Some(d) if d.is_zero())
    }

    pub fn restart(&mut self, duration: Duration) {
        self.mode = Mode::Finite {
            duration,
            target: Instant::now() + duration,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn infinite_never_expires_and_has_no_time_left() {
        let mut d = Deadline::infinite();
        assert!(d.time_left().is_none());
        assert!(!d.expired());
    }

    #[test]
    fn non_blocking_is_immediately_expired() {
        let mut d = Deadline::non_blocking();
        assert_eq!(d.time_left(), Some(Duration::ZERO));
        assert!(d.expired());
    }

    #[test]
    fn finite_counts_down_and_eventually_expires() {
        let mut d = Deadline::finite(Duration::from_millis(20));
        assert!(d.time_left().unwrap() <= Duration::from_millis(20));
        sleep(Duration::from_millis(30));
        assert!(d.expired());
    }

    #[test]
    fn restart_resets_the_window() {
        let mut d = Deadline::finite(Duration::from_millis(5));
        sleep(Duration::from_millis(10));
        assert!(d.expired());
        d.restart(Duration::from_millis(50));
        assert!(!d.expired());
    }
}
