//! Advisory rate-limit budget
//!
//! Records quota headers seen on responses and answers whether another call is
//! likely to succeed. Never blocks or queues requests.

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use crate::checker::http::header_value;

/// Quota state reported by the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBudget {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Answer to "is it safe to issue more requests now?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub can_proceed: bool,
    pub remaining: Option<u64>,
    /// How long a caller would need to wait before the budget resets
    pub wait: Option<chrono::Duration>,
}

#[derive(Debug, Default)]
pub struct RateLimitTracker {
    budget: Mutex<Option<RateLimitBudget>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, budget: RateLimitBudget) {
        if let Ok(mut guard) = self.budget.lock() {
            *guard = Some(budget);
        }
    }

    /// Record `x-ratelimit-limit`, `x-ratelimit-remaining` and `x-ratelimit-reset`
    /// (epoch seconds) if all three are present
    pub fn record_headers(&self, response: &reqwest::Response) {
        let parse = |name: &str| header_value(response, name).and_then(|v| v.parse::<i64>().ok());

        let (Some(limit), Some(remaining), Some(reset)) = (
            parse("x-ratelimit-limit"),
            parse("x-ratelimit-remaining"),
            parse("x-ratelimit-reset"),
        ) else {
            return;
        };

        let Some(reset_at) = Utc.timestamp_opt(reset, 0).single() else {
            return;
        };

        self.record(RateLimitBudget {
            limit: limit.max(0) as u64,
            remaining: remaining.max(0) as u64,
            reset_at,
        });
    }

    pub fn budget(&self) -> Option<RateLimitBudget> {
        self.budget.lock().ok().and_then(|guard| *guard)
    }

    /// Whether proceeding is safe while keeping `reserve` requests in hand
    pub fn status(&self, now: DateTime<Utc>, reserve: u64) -> RateLimitStatus {
        let Some(budget) = self.budget() else {
            return RateLimitStatus {
                can_proceed: true,
                remaining: None,
                wait: None,
            };
        };

        if now >= budget.reset_at || budget.remaining > reserve {
            return RateLimitStatus {
                can_proceed: true,
                remaining: Some(budget.remaining),
                wait: None,
            };
        }

        RateLimitStatus {
            can_proceed: false,
            remaining: Some(budget.remaining),
            wait: Some(budget.reset_at - now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn status_without_data_allows_proceeding() {
        let tracker = RateLimitTracker::new();

        let status = tracker.status(now(), 10);

        assert!(status.can_proceed);
        assert_eq!(status.remaining, None);
    }

    #[test]
    fn status_allows_proceeding_above_reserve() {
        let tracker = RateLimitTracker::new();
        tracker.record(RateLimitBudget {
            limit: 60,
            remaining: 30,
            reset_at: now() + Duration::minutes(10),
        });

        let status = tracker.status(now(), 10);

        assert!(status.can_proceed);
        assert_eq!(status.remaining, Some(30));
        assert_eq!(status.wait, None);
    }

    #[test]
    fn status_reports_wait_when_budget_exhausted() {
        let tracker = RateLimitTracker::new();
        tracker.record(RateLimitBudget {
            limit: 60,
            remaining: 2,
            reset_at: now() + Duration::minutes(10),
        });

        let status = tracker.status(now(), 10);

        assert!(!status.can_proceed);
        assert_eq!(status.wait, Some(Duration::minutes(10)));
    }

    #[test]
    fn status_allows_proceeding_after_reset() {
        let tracker = RateLimitTracker::new();
        tracker.record(RateLimitBudget {
            limit: 60,
            remaining: 0,
            reset_at: now() - Duration::seconds(1),
        });

        assert!(tracker.status(now(), 10).can_proceed);
    }

    #[tokio::test]
    async fn record_headers_reads_github_style_quota() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("x-ratelimit-limit", "60")
            .with_header("x-ratelimit-remaining", "59")
            .with_header("x-ratelimit-reset", "1717243200")
            .create_async()
            .await;

        let response = reqwest::get(server.url()).await.unwrap();
        let tracker = RateLimitTracker::new();
        tracker.record_headers(&response);

        assert_eq!(
            tracker.budget(),
            Some(RateLimitBudget {
                limit: 60,
                remaining: 59,
                reset_at: Utc.timestamp_opt(1717243200, 0).unwrap(),
            })
        );
    }
}
