use moka::future::Cache;
use std::time::Duration;

/// Refresh-token session, keyed by the token's `jti`.
#[derive(Clone, Debug)]
pub struct RefreshSession {
    pub user_id: u64,
    pub revoked: bool,
}

/// In-memory refresh-token registry. Entries expire with the token.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, RefreshSession>,
}

impl SessionStore {
    pub fn new(refresh_ttl_secs: usize) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(refresh_ttl_secs as u64))
                .build(),
        }
    }

    pub async fn open(&self, jti: &str, user_id: u64) {
        self.sessions
            .insert(
                jti.to_string(),
                RefreshSession {
                    user_id,
                    revoked: false,
                },
            )
            .await;
    }

    /// Returns the session only if it exists and was not revoked.
    pub async fn active(&self, jti: &str) -> Option<RefreshSession> {
        self.sessions.get(jti).await.filter(|s| !s.revoked)
    }

    /// Idempotent: revoking an unknown jti is a no-op.
    pub async fn revoke(&self, jti: &str) {
        if let Some(mut session) = self.sessions.get(jti).await {
            session.revoked = true;
            self.sessions.insert(jti.to_string(), session).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn revoked_sessions_are_inactive() {
        let store = SessionStore::new(60);
        store.open("abc", 1).await;
        assert_eq!(store.active("abc").await.map(|s| s.user_id), Some(1));

        store.revoke("abc").await;
        assert!(store.active("abc").await.is_none());

        store.revoke("missing").await;
        assert!(store.active("missing").await.is_none());
    }
}
