//! Built-in suspiciousness metrics

use super::{AccountCache, AccountLookupError, Metric};
use crate::models::{Edit, EditSets};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub const ANON: &str = "anon";
pub const NO_COMMENT: &str = "no_comment";
pub const YOUNG: &str = "young";
pub const FEW_POSTS: &str = "few_posts";

/// Names of all built-in metrics, in registration order.
pub const BUILTIN_METRICS: &[&str] = &[ANON, NO_COMMENT, YOUNG, FEW_POSTS];

/// Edit made without an attributable account.
pub struct AnonMetric;

impl Metric for AnonMetric {
    fn name(&self) -> &str {
        ANON
    }

    fn description(&self) -> &str {
        "edit has no attributable account"
    }

    fn is_suspicious(&self, edit: &Edit) -> bool {
        edit.is_anonymous()
    }
}

/// Sizeable edit without an edit summary.
pub struct NoCommentMetric {
    /// Edits changing more than this many bytes count
    pub min_delta: i64,
}

impl Metric for NoCommentMetric {
    fn name(&self) -> &str {
        NO_COMMENT
    }

    fn description(&self) -> &str {
        "edit summary is empty and the size change is significant"
    }

    fn is_suspicious(&self, edit: &Edit) -> bool {
        edit.comment.is_empty() && edit.size_delta.abs() > self.min_delta
    }
}

/// Edit by an account registered recently.
pub struct YoungAccountMetric {
    pub cache: Arc<AccountCache>,
    pub max_age: Duration,
    /// Reference instant for account age
    pub now: DateTime<Utc>,
}

impl YoungAccountMetric {
    pub fn new(cache: Arc<AccountCache>, max_age_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            cache,
            max_age: Duration::days(i64::from(max_age_days)),
            now,
        }
    }
}

impl Metric for YoungAccountMetric {
    fn name(&self) -> &str {
        YOUNG
    }

    fn description(&self) -> &str {
        "account was registered recently"
    }

    fn prepare(&self, sets: &EditSets) -> Result<(), AccountLookupError> {
        self.cache.prefetch(sets.values().flatten()).map(|_| ())
    }

    fn is_suspicious(&self, edit: &Edit) -> bool {
        if edit.is_anonymous() {
            return false;
        }
        self.cache
            .facts(&edit.user)
            .and_then(|facts| facts.registration)
            .is_some_and(|registered| self.now - registered < self.max_age)
    }
}

/// Edit by an account with few edits overall.
pub struct FewPostsMetric {
    pub cache: Arc<AccountCache>,
    pub max_edits: u64,
}

impl Metric for FewPostsMetric {
    fn name(&self) -> &str {
        FEW_POSTS
    }

    fn description(&self) -> &str {
        "account has a low lifetime edit count"
    }

    fn prepare(&self, sets: &EditSets) -> Result<(), AccountLookupError> {
        self.cache.prefetch(sets.values().flatten()).map(|_| ())
    }

    fn is_suspicious(&self, edit: &Edit) -> bool {
        if edit.is_anonymous() {
            return false;
        }
        self.cache
            .facts(&edit.user)
            .is_some_and(|facts| facts.edit_count <= self.max_edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::accounts::tests::StubLookup;
    use crate::metrics::AccountFacts;
    use crate::models::tests::edit;
    use crate::models::SetKey;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 10, 15, 0, 0, 0).unwrap()
    }

    fn stub() -> StubLookup {
        StubLookup::default()
            .with(
                "Newbie",
                AccountFacts {
                    registration: Some(now() - Duration::days(30)),
                    edit_count: 4,
                },
            )
            .with(
                "Veteran",
                AccountFacts {
                    registration: Some(now() - Duration::days(3000)),
                    edit_count: 25_000,
                },
            )
            .with(
                "Ancient",
                AccountFacts {
                    registration: None,
                    edit_count: 10,
                },
            )
    }

    #[test]
    fn test_no_comment() {
        let metric = NoCommentMetric { min_delta: 10 };
        let mut e = edit(1, "Alice", 5);
        e.size_delta = 15;
        assert!(metric.is_suspicious(&e));
        e.size_delta = -15;
        assert!(metric.is_suspicious(&e));
        e.size_delta = 5;
        assert!(!metric.is_suspicious(&e));
        e.size_delta = 10;
        assert!(!metric.is_suspicious(&e));
        e.comment = "fix typo".into();
        e.size_delta = 1000;
        assert!(!metric.is_suspicious(&e));
    }

    #[test]
    fn test_anon() {
        assert!(AnonMetric.is_suspicious(&edit(1, "198.51.100.7", 0)));
        assert!(!AnonMetric.is_suspicious(&edit(2, "Alice", 5)));
    }

    #[test]
    fn test_young() {
        let cache = Arc::new(AccountCache::new(Arc::new(stub())));
        let metric = YoungAccountMetric::new(cache, 100, now());
        assert!(metric.is_suspicious(&edit(1, "Newbie", 2)));
        assert!(!metric.is_suspicious(&edit(2, "Veteran", 3)));
        assert!(!metric.is_suspicious(&edit(3, "Ancient", 4)));
        assert!(!metric.is_suspicious(&edit(4, "Unknown", 9)));
        assert!(!metric.is_suspicious(&edit(5, "198.51.100.7", 0)));
    }

    #[test]
    fn test_few_posts_is_memoised() {
        let stub = Arc::new(stub());
        let cache = Arc::new(AccountCache::new(stub.clone()));
        let metric = FewPostsMetric {
            cache: cache.clone(),
            max_edits: 10,
        };

        assert!(metric.is_suspicious(&edit(1, "Newbie", 2)));
        assert!(metric.is_suspicious(&edit(2, "Newbie", 2)));
        assert!(metric.is_suspicious(&edit(3, "Ancient", 4)));
        assert!(!metric.is_suspicious(&edit(4, "Veteran", 3)));
        assert_eq!(stub.calls_for("Newbie"), 1);
        assert_eq!(cache.lookups(), 3);
    }

    #[test]
    fn test_prepare_fails_on_lookup_error() {
        let stub = Arc::new(StubLookup {
            failing: vec!["Sock".to_string()],
            ..stub()
        });
        let cache = Arc::new(AccountCache::new(stub.clone()));
        let metric = YoungAccountMetric::new(cache, 100, now());
        let mut sets = EditSets::new();
        sets.insert(
            SetKey::page("P"),
            vec![edit(1, "Newbie", 2), edit(2, "Sock", 8)],
        );

        let err = metric.prepare(&sets).unwrap_err();
        assert_eq!(err.username, "Sock");
        assert_eq!(stub.calls_for("Newbie"), 1);
    }

    #[test]
    fn test_anonymous_edits_skip_lookup() {
        let stub = Arc::new(stub());
        let cache = Arc::new(AccountCache::new(stub.clone()));
        let metric = FewPostsMetric { cache, max_edits: 10 };
        assert!(!metric.is_suspicious(&edit(1, "203.0.113.9", 0)));
        assert_eq!(stub.calls_for("203.0.113.9"), 0);
    }
}
