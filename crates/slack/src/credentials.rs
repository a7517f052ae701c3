use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

/// Tokens recorded for one workspace installation of the app.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Installation {
    pub bot_token: Option<String>,
    pub user_token: Option<String>,
}

/// Lookup capability over wherever OAuth installations are persisted.
/// Optional: single-tenant and local deployments run without one and lean
/// on the static fallback token instead.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    async fn fetch_installation(
        &self,
        team_id: Option<&str>,
        user_id: &str,
    ) -> anyhow::Result<Installation>;
}

/// A resolved delivery token. `from_fallback` is diagnostic only; delivery
/// behaves identically either way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialResult {
    pub token: String,
    pub from_fallback: bool,
}

/// Turns `(team_id, user_id)` into a usable bot token.
///
/// Resolution never fails loudly: a broken or empty installation lookup
/// degrades to the fallback token with a warning, and `None` simply means
/// this recipient cannot be delivered to.
pub struct CredentialResolver {
    store: Option<Arc<dyn InstallationStore>>,
    fallback_token: Option<String>,
}

impl CredentialResolver {
    pub fn new(store: Option<Arc<dyn InstallationStore>>, fallback_token: Option<String>) -> Self {
        Self { store, fallback_token }
    }

    pub async fn resolve(
        &self,
        team_id: Option<&str>,
        user_id: &str,
    ) -> Option<CredentialResult> {
        let Some(store) = &self.store else {
            debug!(
                event_name = "notify.credentials.no_store",
                team_id = team_id.unwrap_or("unknown"),
                user_id,
                "no installation store configured; using fallback token"
            );
            return self.fallback();
        };

        match store.fetch_installation(team_id, user_id).await {
            Ok(installation) => {
                // Bot token wins over user token when both are recorded.
                let token = installation
                    .bot_token
                    .or(installation.user_token)
                    .filter(|token| !token.trim().is_empty());

                match token {
                    Some(token) => Some(CredentialResult { token, from_fallback: false }),
                    None => {
                        warn!(
                            event_name = "notify.credentials.lookup_empty",
                            team_id = team_id.unwrap_or("unknown"),
                            user_id,
                            "installation lookup returned no token; using fallback token"
                        );
                        self.fallback()
                    }
                }
            }
            Err(error) => {
                warn!(
                    event_name = "notify.credentials.lookup_failed",
                    team_id = team_id.unwrap_or("unknown"),
                    user_id,
                    error = %error,
                    "installation lookup failed; using fallback token"
                );
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> Option<CredentialResult> {
        self.fallback_token
            .clone()
            .map(|token| CredentialResult { token, from_fallback: true })
    }
}
