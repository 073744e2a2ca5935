//! Process configuration: built-in defaults, optional `.env` file, and
//! explicit uppercase environment overrides, validated before use.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Comma-separated list fields (CORS origins) arrive as one string.
fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Environment variable to settings key. The uppercase names are the
/// documented deployment contract; everything else uses the defaults.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("NMAP_PATH", "nmap_path"),
    ("NUCLEI_PATH", "nuclei_path"),
    ("VIRUSTOTAL_API_KEY", "virustotal_api_key"),
    ("ABUSEIP_API_KEY", "abuseipdb_api_key"),
    ("ANALYSIS_API_KEY", "analysis_api_key"),
    ("CORS_ALLOW_ORIGINS", "cors_allow_origins"),
    ("LOG_LEVEL", "log_level"),
    ("LOG_FORMAT", "log_format"),
    ("MAX_CONCURRENT_SCANS", "max_concurrent_scans"),
    ("VULN_SCAN_TIMEOUT_SECONDS", "vuln_scan_timeout_seconds"),
    ("REPUTATION_TIMEOUT_SECONDS", "reputation_timeout_seconds"),
    ("REPUTATION_CONCURRENCY", "reputation_concurrency"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // Engine binaries
    pub nmap_path: String,
    pub nuclei_path: String,

    // Reputation provider credentials, all optional
    pub virustotal_api_key: Option<String>,
    pub abuseipdb_api_key: Option<String>,

    // Optional analysis backend credential, surfaced in tools status only
    pub analysis_api_key: Option<String>,

    #[serde(deserialize_with = "comma_separated")]
    pub cors_allow_origins: Vec<String>,

    pub log_level: String,
    pub log_format: String,

    // Orchestration bounds
    pub max_concurrent_scans: u32,
    pub vuln_scan_timeout_seconds: u64,
    pub reputation_timeout_seconds: f64,
    pub reputation_concurrency: u32,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_env(true)
    }

    /// Load settings, optionally reading a `.env` file first.
    pub fn from_env(read_env_file: bool) -> Result<Self, ConfigError> {
        #[cfg(not(test))]
        if read_env_file {
            dotenvy::dotenv().ok();
        }
        #[cfg(test)]
        let _ = read_env_file;

        let mut builder = config::Config::builder()
            .set_default("nmap_path", "nmap")?
            .set_default("nuclei_path", "nuclei")?
            .set_default("virustotal_api_key", None::<String>)?
            .set_default("abuseipdb_api_key", None::<String>)?
            .set_default("analysis_api_key", None::<String>)?
            .set_default(
                "cors_allow_origins",
                "http://localhost:3000,http://127.0.0.1:3000",
            )?
            .set_default("log_level", "INFO")?
            .set_default("log_format", "json")?
            .set_default("max_concurrent_scans", 5u32)?
            .set_default("vuln_scan_timeout_seconds", 180u64)?
            .set_default("reputation_timeout_seconds", 10.0)?
            .set_default("reputation_concurrency", 8u32)?;

        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "json" | "plain") {
            return Err(ConfigError::Validation(
                "log_format must be 'json' or 'plain'".to_string(),
            ));
        }
        if self.nmap_path.is_empty() || self.nuclei_path.is_empty() {
            return Err(ConfigError::Validation(
                "engine paths must not be empty".to_string(),
            ));
        }
        if self.max_concurrent_scans == 0 {
            return Err(ConfigError::Validation(
                "max_concurrent_scans must be greater than 0".to_string(),
            ));
        }
        if self.vuln_scan_timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "vuln_scan_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.reputation_timeout_seconds <= 0.0 {
            return Err(ConfigError::Validation(
                "reputation_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.reputation_concurrency == 0 {
            return Err(ConfigError::Validation(
                "reputation_concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_env(false).unwrap();
        assert_eq!(settings.nmap_path, "nmap");
        assert_eq!(settings.nuclei_path, "nuclei");
        assert_eq!(settings.max_concurrent_scans, 5);
        assert_eq!(settings.vuln_scan_timeout_seconds, 180);
        assert_eq!(settings.reputation_concurrency, 8);
    }

    #[test]
    fn test_cors_origins_split_and_trimmed() {
        let settings = Settings::from_env(false).unwrap();
        assert!(!settings.cors_allow_origins.is_empty());
        assert!(settings
            .cors_allow_origins
            .iter()
            .all(|o| !o.contains(',') && o == o.trim()));
    }

    #[test]
    fn test_validation_rejects_bad_log_format() {
        let mut settings = Settings::from_env(false).unwrap();
        settings.log_format = "xml".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let mut settings = Settings::from_env(false).unwrap();
        settings.max_concurrent_scans = 0;
        assert!(settings.validate().is_err());
    }
}
