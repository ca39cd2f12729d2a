use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;
const DEFAULT_SITE_URL: &str = "tauri://localhost";
const DEFAULT_GEOCODING_ENDPOINT: &str = "https://api.opencagedata.com/geocode/v1/json";
const DEFAULT_GEOCODING_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    pub app_name: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeocodingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_geocoding_endpoint(),
            api_key: None,
            timeout_seconds: DEFAULT_GEOCODING_TIMEOUT_SECONDS,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA as u8,
            app_name: "TimeScape".to_string(),
            timezone: None,
            site_url: default_site_url(),
            backend: BackendConfig::default(),
            geocoding: GeocodingConfig::default(),
        }
    }
}

/// Backend endpoint and publishable key after env overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    pub url: String,
    pub anon_key: String,
}

impl AppConfig {
    pub fn backend_endpoint(&self) -> Result<BackendEndpoint, InfraError> {
        let url = self
            .backend
            .url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                InfraError::InvalidConfig(
                    "missing backend url (set backend.url in app.json or one of: TIMESCAPE_SUPABASE_URL, SUPABASE_URL)"
                        .to_string(),
                )
            })?;
        let anon_key = self
            .backend
            .anon_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                InfraError::InvalidConfig(
                    "missing backend key (set backend.anonKey in app.json or one of: TIMESCAPE_SUPABASE_ANON_KEY, SUPABASE_ANON_KEY)"
                        .to_string(),
                )
            })?;
        Ok(BackendEndpoint {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    /// Geocoding is used only when enabled and a key is available.
    pub fn geocoding_api_key(&self) -> Option<&str> {
        if !self.geocoding.enabled {
            return None;
        }
        self.geocoding
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    load_app_config_with_lookup(config_dir, |key| std::env::var(key).ok())
}

pub fn load_app_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = config_dir.join(APP_JSON);
    let raw = read_config(&path)?;
    let mut config: AppConfig = serde_json::from_value(raw).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid {}: {error}", path.display()))
    })?;

    if let Some(url) = optional_lookup_value(&lookup, &["TIMESCAPE_SUPABASE_URL", "SUPABASE_URL"]) {
        config.backend.url = Some(url);
    }
    if let Some(key) =
        optional_lookup_value(&lookup, &["TIMESCAPE_SUPABASE_ANON_KEY", "SUPABASE_ANON_KEY"])
    {
        config.backend.anon_key = Some(key);
    }
    if let Some(site_url) = optional_lookup_value(&lookup, &["TIMESCAPE_SITE_URL"]) {
        config.site_url = site_url;
    }
    if let Some(api_key) =
        optional_lookup_value(&lookup, &["TIMESCAPE_OPENCAGE_API_KEY", "OPENCAGE_API_KEY"])
    {
        config.geocoding.api_key = Some(api_key);
    }
    if let Some(timezone) = optional_lookup_value(&lookup, &["TIMESCAPE_TIMEZONE"]) {
        config.timezone = Some(timezone);
    }

    Ok(config)
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

fn default_site_url() -> String {
    DEFAULT_SITE_URL.to_string()
}

fn default_geocoding_endpoint() -> String {
    DEFAULT_GEOCODING_ENDPOINT.to_string()
}

fn default_geocoding_timeout() -> u64 {
    DEFAULT_GEOCODING_TIMEOUT_SECONDS
}
