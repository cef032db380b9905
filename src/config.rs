use std::env;

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Mock,
    Stripe,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub checkout_ttl_minutes: i64,
    pub max_order_quantity: i32,
    pub restock_on_cancel: bool,
    pub cookie_secure: bool,
    pub upload_dir: String,
    pub gateway: GatewayKind,
    pub stripe_secret_key: Option<String>,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let session_secret = env::var("SESSION_SECRET").context("SESSION_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000)?;

        let gateway = match env::var("PAYMENT_GATEWAY")
            .unwrap_or_else(|_| "mock".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "mock" => GatewayKind::Mock,
            "stripe" => GatewayKind::Stripe,
            other => anyhow::bail!("unknown PAYMENT_GATEWAY {other:?}"),
        };
        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").ok();
        if gateway == GatewayKind::Stripe && stripe_secret_key.is_none() {
            anyhow::bail!("STRIPE_SECRET_KEY is required when PAYMENT_GATEWAY=stripe");
        }

        Ok(Self {
            database_url,
            host,
            port,
            session_secret,
            session_ttl_hours: parse_or("SESSION_TTL_HOURS", 24)?,
            checkout_ttl_minutes: parse_or("CHECKOUT_TTL_MINUTES", 15)?,
            max_order_quantity: parse_or("MAX_ORDER_QUANTITY", 100)?,
            restock_on_cancel: parse_or("RESTOCK_ON_CANCEL", false)?,
            cookie_secure: parse_or("COOKIE_SECURE", false)?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            gateway,
            stripe_secret_key,
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
        })
    }

    /// Defaults suitable for tests and local tooling; only the secret and URL are supplied.
    pub fn for_tests(database_url: impl Into<String>, session_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            session_secret: session_secret.into(),
            session_ttl_hours: 24,
            checkout_ttl_minutes: 15,
            max_order_quantity: 100,
            restock_on_cancel: false,
            cookie_secure: false,
            upload_dir: std::env::temp_dir()
                .join("order-portal-uploads")
                .to_string_lossy()
                .into_owned(),
            gateway: GatewayKind::Mock,
            stripe_secret_key: None,
            currency: "usd".to_string(),
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}
