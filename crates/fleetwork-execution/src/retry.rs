//! Bounded backoff for optimistic-concurrency retries

use rand::Rng;
use std::time::Duration;

/// Retry budget and delay shape
///
/// `steps` is the total number of attempts, so a policy with `steps = 5`
/// sleeps at most four times.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub steps: u32,
    pub initial_delay: Duration,
    pub factor: f64,
    /// Fraction of each delay added as random jitter
    pub jitter: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            steps: 5,
            initial_delay: Duration::from_millis(10),
            factor: 1.0,
            jitter: 0.1,
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts
    pub fn immediate(steps: u32) -> Self {
        Self {
            steps,
            initial_delay: Duration::ZERO,
            factor: 1.0,
            jitter: 0.0,
            max_delay: Duration::ZERO,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            remaining: self.steps.saturating_sub(1),
            next: self.initial_delay,
            policy: self.clone(),
        }
    }
}

/// Delays to sleep between attempts; exhausted once the budget is spent
#[derive(Debug, Clone)]
pub struct Backoff {
    remaining: u32,
    next: Duration,
    policy: RetryPolicy,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let max = self.policy.max_delay;
        let base = self.next.min(max);
        self.next = scale(base, self.policy.factor.max(1.0)).unwrap_or(max).min(max);

        let jitter = self.policy.jitter;
        if jitter.is_finite() && jitter > 0.0 && !base.is_zero() {
            let extra = rand::thread_rng().gen_range(0.0..=jitter);
            return Some(base.saturating_add(scale(base, extra).unwrap_or(Duration::ZERO)));
        }
        Some(base)
    }
}

/// `delay * factor`, or `None` when the product is not a valid duration
fn scale(delay: Duration, factor: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_bound_sleeps() {
        assert_eq!(RetryPolicy::immediate(5).backoff().count(), 4);
        assert_eq!(RetryPolicy::immediate(1).backoff().count(), 0);
        assert_eq!(RetryPolicy::immediate(0).backoff().count(), 0);
    }

    #[test]
    fn test_exponential_growth_capped() {
        let policy = RetryPolicy {
            steps: 6,
            initial_delay: Duration::from_millis(10),
            factor: 2.0,
            jitter: 0.0,
            max_delay: Duration::from_millis(50),
        };
        let delays: Vec<_> = policy.backoff().map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![10, 20, 40, 50, 50]);
    }

    #[test]
    fn test_huge_factor_saturates_at_max_delay() {
        for factor in [f64::INFINITY, 1e30, f64::MAX] {
            let policy = RetryPolicy {
                steps: 4,
                initial_delay: Duration::from_millis(10),
                factor,
                jitter: 0.1,
                max_delay: Duration::from_millis(200),
            };
            let delays: Vec<_> = policy.backoff().collect();
            assert_eq!(delays.len(), 3);
            assert!(delays[0] <= Duration::from_millis(11));
            for delay in &delays[1..] {
                assert!(*delay >= Duration::from_millis(200));
                assert!(*delay <= Duration::from_millis(220));
            }
        }
    }

    #[test]
    fn test_unusable_jitter_is_ignored() {
        let policy = RetryPolicy {
            steps: 3,
            jitter: f64::NAN,
            ..RetryPolicy::default()
        };
        let delays: Vec<_> = policy.backoff().collect();
        assert_eq!(delays, vec![Duration::from_millis(10); 2]);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            steps: 50,
            jitter: 0.5,
            ..RetryPolicy::default()
        };
        for delay in policy.backoff() {
            assert!(delay >= Duration::from_millis(10));
            assert!(delay <= Duration::from_millis(15));
        }
    }
}
