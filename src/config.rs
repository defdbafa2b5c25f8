use serde::Deserialize;

use crate::models::{FilterPolicy, QualifyOptions};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub qualifying_status: String,
    pub filter_policy: FilterPolicy,
    pub whatsapp_country_code: String,
    pub consultant_name: String,
    pub brand_name: String,
    pub max_upload_bytes: usize,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            qualifying_status: "Pedido Salvo".to_string(),
            filter_policy: FilterPolicy::FirstOccurrence,
            whatsapp_country_code: "55".to_string(),
            consultant_name: "Tais".to_string(),
            brand_name: "Jumbo CDP".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            cache_ttl_secs: 3600,
            cache_max_entries: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            qualifying_status: match std::env::var("QUALIFYING_STATUS") {
                Ok(status) => {
                    if status.trim().is_empty() {
                        anyhow::bail!("QUALIFYING_STATUS cannot be empty");
                    }
                    status
                }
                Err(_) => defaults.qualifying_status,
            },
            filter_policy: std::env::var("FILTER_POLICY")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<FilterPolicy>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("FILTER_POLICY: {}", e))?
                .unwrap_or(defaults.filter_policy),
            whatsapp_country_code: match std::env::var("WHATSAPP_COUNTRY_CODE") {
                Ok(code) => {
                    let code = code.trim().to_string();
                    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
                        anyhow::bail!("WHATSAPP_COUNTRY_CODE must contain digits only");
                    }
                    code
                }
                Err(_) => defaults.whatsapp_country_code,
            },
            consultant_name: non_empty_or("CONSULTANT_NAME", defaults.consultant_name)?,
            brand_name: non_empty_or("BRAND_NAME", defaults.brand_name)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            cache_ttl_secs: parse_or("CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            cache_max_entries: parse_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
        };

        if config.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be greater than zero");
        }

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Qualifying status: {:?}", config.qualifying_status);
        tracing::debug!("Filter policy: {}", config.filter_policy);
        tracing::debug!(
            "Cache: ttl={}s, max_entries={}",
            config.cache_ttl_secs,
            config.cache_max_entries
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Qualification options derived from this configuration.
    pub fn qualify_options(&self) -> QualifyOptions {
        QualifyOptions {
            qualifying_status: self.qualifying_status.clone(),
            policy: self.filter_policy,
            country_code: self.whatsapp_country_code.clone(),
            consultant_name: self.consultant_name.clone(),
            brand_name: self.brand_name.clone(),
        }
    }
}

fn non_empty_or(key: &str, default: String) -> anyhow::Result<String> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => anyhow::bail!("{} cannot be empty", key),
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => Ok(default),
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid non-negative number", key)),
        Err(_) => Ok(default),
    }
}
