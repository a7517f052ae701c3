use std::sync::Arc;
use std::time::Duration;

use mudlark_core::bus::NoopEventBus;
use mudlark_core::config::{AppConfig, ConfigError, LoadOptions};
use mudlark_slack::{
    ClientPool, CredentialResolver, GuildCrierFormatter, NotificationService, WebApiFactory,
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub notifications: NotificationService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires the notification pipeline from an already-loaded config.
///
/// This binary ships without a broker bridge or an installation store:
/// the bus is the no-op stand-in until the game's broker is wired in, and
/// credentials come from the configured fallback token.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        channel_prefix = %config.bus.channel_prefix,
        "starting application bootstrap"
    );

    let fallback_token = config
        .slack
        .fallback_bot_token
        .as_ref()
        .map(|token| token.expose_secret().to_owned());

    info!(
        event_name = "system.bootstrap.credential_mode",
        mode = if fallback_token.is_some() { "fallback_token" } else { "unconfigured" },
        "credential resolution mode selected"
    );

    let resolver = CredentialResolver::new(None, fallback_token);
    let pool = ClientPool::new(Arc::new(WebApiFactory::new(config.slack.api_base_url.clone())));
    let notifications = NotificationService::new(
        Arc::new(NoopEventBus),
        &config.bus.channel_prefix,
        resolver,
        pool,
        Some(Arc::new(GuildCrierFormatter)),
        Duration::from_secs(config.slack.call_timeout_secs),
    );

    Ok(Application { config, notifications })
}

#[cfg(test)]
mod tests {
    use mudlark_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    fn overrides(fallback_token: Option<&str>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                channel_prefix: Some("testgame".to_owned()),
                fallback_bot_token: fallback_token.map(str::to_owned),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_a_malformed_fallback_token() {
        let result = bootstrap(overrides(Some("xapp-not-a-bot-token"))).await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.fallback_bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_wires_a_startable_service_on_the_noop_bus() {
        let app = bootstrap(overrides(Some("xoxb-test")))
            .await
            .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.config.bus.channel_prefix, "testgame");

        // The noop bus hands back a closed subscription, so the consumer
        // starts, drains nothing, and stop returns promptly.
        app.notifications.start().await.expect("start");
        app.notifications.stop().await.expect("stop");
    }
}
