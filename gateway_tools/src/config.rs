use log::*;
use nvd_common::{parse_boolean_flag, Secret};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL for the gateway's REST API, e.g. "https://api.gateway.example".
    pub base_url: String,
    pub key_id: String,
    pub key_secret: Secret<String>,
    /// Shared secret used to sign webhook deliveries and client payment confirmations.
    pub webhook_secret: Secret<String>,
    /// If false, webhook signature checks are skipped. Only ever disable this against a local gateway
    /// simulator.
    pub hmac_checks: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::default(),
            key_id: String::default(),
            key_secret: Secret::default(),
            webhook_secret: Secret::default(),
            hmac_checks: true,
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("NVD_GATEWAY_BASE_URL").unwrap_or_else(|_| {
            warn!("NVD_GATEWAY_BASE_URL not set, using https://api.gateway.example as default");
            "https://api.gateway.example".to_string()
        });
        let key_id = std::env::var("NVD_GATEWAY_KEY_ID").unwrap_or_else(|_| {
            warn!("NVD_GATEWAY_KEY_ID not set, using (probably useless) default");
            "key_id_0000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("NVD_GATEWAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("NVD_GATEWAY_KEY_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("NVD_GATEWAY_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("NVD_GATEWAY_WEBHOOK_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let hmac_checks = parse_boolean_flag(std::env::var("NVD_GATEWAY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are DISABLED. Anyone can forge payment events.");
        }
        Self { base_url, key_id, key_secret, webhook_secret, hmac_checks }
    }
}
