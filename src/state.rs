use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha512};

use crate::{
    config::{AppConfig, GatewayKind},
    gateway::{PaymentGateway, mock::MockGateway, stripe::StripeGateway},
    storage::ImageStore,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub images: ImageStore,
    cookie_key: Key,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: AppConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        // Key::from needs 64 bytes of master key material.
        let cookie_key = Key::from(&Sha512::digest(config.session_secret.as_bytes())[..]);
        let images = ImageStore::new(&config.upload_dir);
        Self {
            orm,
            config: Arc::new(config),
            gateway,
            images,
            cookie_key,
        }
    }

    /// Picks the gateway named by the configuration.
    pub fn from_config(orm: DatabaseConnection, config: AppConfig) -> anyhow::Result<Self> {
        let gateway: Arc<dyn PaymentGateway> = match config.gateway {
            GatewayKind::Mock => Arc::new(MockGateway::auto_confirming()),
            GatewayKind::Stripe => {
                let key = config
                    .stripe_secret_key
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("STRIPE_SECRET_KEY is not set"))?;
                Arc::new(StripeGateway::new(key))
            }
        };
        Ok(Self::new(orm, config, gateway))
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(secret: &str) -> AppState {
        AppState::new(
            DatabaseConnection::Disconnected,
            AppConfig::for_tests("postgres://unused", secret),
            Arc::new(MockGateway::default()),
        )
    }

    #[test]
    fn cookie_key_follows_the_session_secret() {
        let first = Key::from_ref(&state("cookie-secret"));
        let again = Key::from_ref(&state("cookie-secret"));
        let other = Key::from_ref(&state("another-secret"));
        assert_eq!(first.master(), again.master());
        assert_ne!(first.master(), other.master());
    }
}
