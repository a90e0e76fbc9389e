//! Cookie sessions backed by a shared store.
//!
//! The record format belongs to tower-sessions; Flight only decides the
//! cookie attributes and the signing key.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use sha2::{Digest, Sha512};
use tower_sessions::{
    cookie::{Key, SameSite},
    Expiry, Session, SessionManagerLayer, SessionStore,
};

use crate::config::SessionConfig;

const STARTED_AT_KEY: &str = "flight.started_at";

/// 64-byte cookie signing key derived from the app key and secret.
pub fn signing_key(config: &SessionConfig) -> Key {
    let mut hasher = Sha512::new();
    hasher.update(config.app_key.as_bytes());
    hasher.update([0u8]);
    hasher.update(config.app_secret.as_bytes());
    Key::from(hasher.finalize().as_slice())
}

pub fn expiry(config: &SessionConfig) -> Expiry {
    if config.max_age_ms == 0 {
        Expiry::OnSessionEnd
    } else {
        let ms = i64::try_from(config.max_age_ms).unwrap_or(i64::MAX);
        Expiry::OnInactivity(time::Duration::milliseconds(ms))
    }
}

/// Wrap `router` in the session layer.
pub fn with_sessions<S>(router: Router, store: S, config: &SessionConfig) -> Router
where
    S: SessionStore + Clone,
{
    let layer = SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_path("/")
        .with_same_site(SameSite::Strict)
        .with_http_only(true)
        .with_secure(false)
        .with_expiry(expiry(config))
        .with_signed(signing_key(config));

    router.layer(layer)
}

/// Id of the caller's session, creating and saving a session if the caller
/// has none yet.
pub async fn ensure_session_id(session: &Session) -> Option<String> {
    if session.id().is_none() {
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        if let Err(e) = session.insert(STARTED_AT_KEY, started_at).await {
            tracing::warn!(error = %e, "Failed to start session");
            return None;
        }
        if let Err(e) = session.save().await {
            tracing::warn!(error = %e, "Failed to save session");
            return None;
        }
    }
    session.id().map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_depends_on_secret() {
        let a = SessionConfig::default();
        let b = SessionConfig {
            app_secret: "another".into(),
            ..SessionConfig::default()
        };
        assert_eq!(signing_key(&a).master(), signing_key(&a).master());
        assert_ne!(signing_key(&a).master(), signing_key(&b).master());
    }

    #[test]
    fn test_zero_max_age_is_browser_session() {
        let config = SessionConfig {
            max_age_ms: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(expiry(&config), Expiry::OnSessionEnd));

        let config = SessionConfig::default();
        assert!(matches!(
            expiry(&config),
            Expiry::OnInactivity(d) if d == time::Duration::days(1)
        ));
    }
}
