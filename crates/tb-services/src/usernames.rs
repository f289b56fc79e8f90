//! # UsernameResolver
//!
//! Maps comment owners to display names. Lookups are memoized per user id
//! for the lifetime of the resolver, and concurrent lookups for the same id
//! share one request. A failed lookup degrades to a placeholder label and
//! never blocks rendering.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use tb_core::{UserDirectory, ANONYMOUS_USER_ID};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Localizable labels used in place of a real username.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayLabels {
    pub anonymous: String,
    pub unknown: String,
    pub loading: String,
}

impl Default for DisplayLabels {
    fn default() -> Self {
        Self {
            anonymous: "Anonymous".to_string(),
            unknown: "Unknown".to_string(),
            loading: "Loading...".to_string(),
        }
    }
}

pub struct UsernameResolver {
    directory: Arc<dyn UserDirectory>,
    labels: DisplayLabels,
    timeout: Duration,
    names: DashMap<String, Arc<OnceCell<String>>>,
}

impl UsernameResolver {
    pub fn new(directory: Arc<dyn UserDirectory>, labels: DisplayLabels, timeout: Duration) -> Self {
        Self {
            directory,
            labels,
            timeout,
            names: DashMap::new(),
        }
    }

    pub fn labels(&self) -> &DisplayLabels {
        &self.labels
    }

    /// Synchronous path for the sentinel; no lookup is ever issued for it.
    pub fn anonymous_label(&self, user_id: &str) -> Option<&str> {
        (user_id == ANONYMOUS_USER_ID).then_some(self.labels.anonymous.as_str())
    }

    /// Display name for `user_id`. Infallible by contract.
    pub async fn resolve(&self, user_id: &str) -> String {
        if let Some(label) = self.anonymous_label(user_id) {
            return label.to_string();
        }

        // Clone the cell out so no map guard is held across the await.
        let cell = self
            .names
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let lookup = cell
            .get_or_try_init(|| async {
                match tokio::time::timeout(self.timeout, self.directory.user(user_id)).await {
                    Ok(Ok(Some(profile))) => Ok(profile.username),
                    // A missing user stays missing for this view.
                    Ok(Ok(None)) => {
                        debug!(user_id, "user not found");
                        Ok(self.labels.unknown.clone())
                    }
                    Ok(Err(err)) => Err(err.to_string()),
                    Err(_) => Err(format!("timed out after {:?}", self.timeout)),
                }
            })
            .await;

        match lookup {
            Ok(name) => name.clone(),
            Err(reason) => {
                warn!(user_id, %reason, "username lookup failed");
                self.labels.unknown.clone()
            }
        }
    }

    /// Already-known name without issuing a lookup.
    pub fn cached(&self, user_id: &str) -> Option<String> {
        if let Some(label) = self.anonymous_label(user_id) {
            return Some(label.to_string());
        }
        self.names
            .get(user_id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Name to render right now: the cached name, or the loading label.
    pub fn display_name(&self, user_id: &str) -> String {
        self.cached(user_id)
            .unwrap_or_else(|| self.labels.loading.clone())
    }

    /// Resolves every distinct id concurrently and warms the cache.
    pub async fn prefetch<'a, I>(&self, user_ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = std::collections::HashSet::new();
        let lookups = user_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .map(|id| self.resolve(id));
        futures::future::join_all(lookups).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::{MockUserDirectory, UserProfile};

    fn resolver(directory: MockUserDirectory) -> UsernameResolver {
        UsernameResolver::new(
            Arc::new(directory),
            DisplayLabels::default(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn sentinel_never_hits_the_directory() {
        let mut directory = MockUserDirectory::new();
        directory.expect_user().never();
        let resolver = resolver(directory);

        assert_eq!(resolver.anonymous_label("-1"), Some("Anonymous"));
        assert_eq!(resolver.resolve("-1").await, "Anonymous");
        assert_eq!(resolver.display_name("-1"), "Anonymous");
    }

    #[tokio::test]
    async fn lookups_are_memoized() {
        let mut directory = MockUserDirectory::new();
        directory.expect_user().times(1).returning(|id| {
            Ok(Some(UserProfile {
                id: id.to_string(),
                username: "alice".into(),
            }))
        });
        let resolver = resolver(directory);

        assert_eq!(resolver.display_name("u1"), "Loading...");
        assert_eq!(resolver.resolve("u1").await, "alice");
        assert_eq!(resolver.resolve("u1").await, "alice");
        assert_eq!(resolver.cached("u1").as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn prefetch_dedups_repeated_authors() {
        let mut directory = MockUserDirectory::new();
        directory.expect_user().times(2).returning(|id| {
            Ok(Some(UserProfile {
                id: id.to_string(),
                username: format!("name-{id}"),
            }))
        });
        let resolver = resolver(directory);

        resolver.prefetch(["u1", "u2", "u1", "-1", "u2"]).await;
        assert_eq!(resolver.display_name("u2"), "name-u2");
    }

    #[tokio::test]
    async fn failures_degrade_to_unknown_and_retry_later() {
        let mut directory = MockUserDirectory::new();
        let mut seq = mockall::Sequence::new();
        directory
            .expect_user()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        directory
            .expect_user()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id| {
                Ok(Some(UserProfile {
                    id: id.to_string(),
                    username: "bob".into(),
                }))
            });
        let resolver = resolver(directory);

        assert_eq!(resolver.resolve("u2").await, "Unknown");
        assert!(resolver.cached("u2").is_none());
        assert_eq!(resolver.resolve("u2").await, "bob");
    }

    #[tokio::test]
    async fn missing_user_is_unknown() {
        let mut directory = MockUserDirectory::new();
        directory.expect_user().times(1).returning(|_| Ok(None));
        let resolver = resolver(directory);

        assert_eq!(resolver.resolve("ghost").await, "Unknown");
        assert_eq!(resolver.resolve("ghost").await, "Unknown");
    }
}
