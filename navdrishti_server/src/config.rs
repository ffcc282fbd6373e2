use std::{env, io::Write};

use chrono::Duration;
use gateway_tools::GatewayConfig;
use log::*;
use nvd_common::Secret;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::{errors::ServerError, integrations::carrier::CarrierConfig};

const DEFAULT_NVD_HOST: &str = "127.0.0.1";
const DEFAULT_NVD_PORT: u16 = 8420;
const DEFAULT_PENDING_ORDER_TIMEOUT: Duration = Duration::hours(24);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The time before an unpaid order is considered abandoned and cancelled by the expiry worker. This
    /// closes the window in which stock was promised at creation but never captured.
    pub pending_order_timeout: Duration,
    /// Payment gateway credentials and shared signing secrets.
    pub gateway: GatewayConfig,
    /// Shipping carrier API configuration.
    pub carrier: CarrierConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_NVD_HOST.to_string(),
            port: DEFAULT_NVD_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            pending_order_timeout: DEFAULT_PENDING_ORDER_TIMEOUT,
            gateway: GatewayConfig::default(),
            carrier: CarrierConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("NVD_HOST").ok().unwrap_or_else(|| DEFAULT_NVD_HOST.into());
        let port = env::var("NVD_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for NVD_PORT. {e} Using the default, {DEFAULT_NVD_PORT}, instead.");
                    DEFAULT_NVD_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_NVD_PORT);
        let database_url = env::var("NVD_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ NVD_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let pending_order_timeout = configure_pending_order_timeout();
        let gateway = GatewayConfig::new_from_env_or_default();
        let carrier = CarrierConfig::from_env_or_default();
        Self { host, port, database_url, auth, pending_order_timeout, gateway, carrier }
    }
}

fn configure_pending_order_timeout() -> Duration {
    env::var("NVD_PENDING_ORDER_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ NVD_PENDING_ORDER_TIMEOUT is not set. Using the default value of {} hrs.",
                DEFAULT_PENDING_ORDER_TIMEOUT.num_hours()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::hours)
                .map_err(|e| warn!("🪛️ Invalid configuration value for NVD_PENDING_ORDER_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_PENDING_ORDER_TIMEOUT)
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret shared with the identity service. Access tokens presented to `/api` routes must be
    /// signed with this secret.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this, since no externally issued token will validate. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production \
                         instance, you are doing it wrong! Set the NVD_JWT_SECRET environment variable instead. \
                         🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("NVD_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [NVD_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "NVD_JWT_SECRET must be at least 32 characters long.".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}
