use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: StripeConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    #[serde(default)]
    pub resend_api_key: String,
    #[serde(default)]
    pub resend_from_email: String,
    #[serde(default)]
    pub twilio_account_sid: String,
    #[serde(default)]
    pub twilio_auth_token: String,
    #[serde(default)]
    pub twilio_from_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Public site base URL, used for checkout success/cancel redirects.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Maximum spots a single order may reserve.
    #[serde(default = "default_per_order_cap")]
    pub per_order_cap: i64,
    /// Minutes a PENDING reservation holds capacity before it lapses.
    #[serde(default = "default_hold_ttl_minutes")]
    pub hold_ttl_minutes: i64,
    /// Fallback IANA timezone for events created without one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_per_order_cap() -> i64 {
    10
}

fn default_hold_ttl_minutes() -> i64 {
    30
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            per_order_cap: default_per_order_cap(),
            hold_ttl_minutes: default_hold_ttl_minutes(),
            default_timezone: default_timezone(),
        }
    }
}

impl Config {
    /// Load config from `CONFIG_PATH` (default `config.toml`). A missing
    /// file is fine as long as `DATABASE_URL` is set; environment
    /// variables always override file values.
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| anyhow::anyhow!("failed to parse {config_path}: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = env::var("DATABASE_URL").map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL is required when {config_path} is absent")
                })?;

                Config {
                    server: ServerConfig {
                        host: "0.0.0.0".to_string(),
                        port: 8080,
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: 10,
                    },
                    stripe: StripeConfig {
                        secret_key: String::new(),
                        webhook_secret: String::new(),
                    },
                    notify: NotifyConfig::default(),
                    booking: BookingConfig::default(),
                }
            }
            Err(e) => return Err(anyhow::anyhow!("failed to read {config_path}: {e}")),
        };

        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("STRIPE_SECRET_KEY") {
            config.stripe.secret_key = v;
        }
        if let Ok(v) = env::var("STRIPE_WEBHOOK_SECRET") {
            config.stripe.webhook_secret = v;
        }
        if let Ok(v) = env::var("RESEND_API_KEY") {
            config.notify.resend_api_key = v;
        }
        if let Ok(v) = env::var("RESEND_FROM_EMAIL") {
            config.notify.resend_from_email = v;
        }
        if let Ok(v) = env::var("TWILIO_ACCOUNT_SID") {
            config.notify.twilio_account_sid = v;
        }
        if let Ok(v) = env::var("TWILIO_AUTH_TOKEN") {
            config.notify.twilio_auth_token = v;
        }
        if let Ok(v) = env::var("TWILIO_FROM_PHONE") {
            config.notify.twilio_from_phone = v;
        }
        if let Ok(v) = env::var("SITE_URL") {
            config.booking.site_url = v;
        }
        if let Ok(v) = env::var("BOOKING_PER_ORDER_CAP")
            && let Ok(n) = v.parse()
        {
            config.booking.per_order_cap = n;
        }
        if let Ok(v) = env::var("BOOKING_HOLD_TTL_MINUTES")
            && let Ok(n) = v.parse()
        {
            config.booking.hold_ttl_minutes = n;
        }
        if let Ok(v) = env::var("BOOKING_DEFAULT_TIMEZONE") {
            config.booking.default_timezone = v;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_defaults() {
        let booking = BookingConfig::default();
        assert_eq!(booking.per_order_cap, 10);
        assert_eq!(booking.hold_ttl_minutes, 30);
        assert_eq!(booking.default_timezone, "America/New_York");
    }

    #[test]
    fn parses_minimal_toml() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/yardpark"
            max_connections = 5

            [stripe]
            secret_key = "sk_test_123"
            webhook_secret = "whsec_123"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.booking.per_order_cap, 10);
        assert!(config.notify.resend_api_key.is_empty());
    }
}
