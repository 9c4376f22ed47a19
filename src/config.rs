use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use crate::gateway::GatewaySettings;
use crate::llm::media::DownscaleSettings;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const API_KEY_VARIABLES: [&str; 3] = ["GEMINI_API_KEY", "API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_image_model: String,
    pub gemini_base_url: Url,
    pub gemini_timeout: Duration,
    pub bind_address: IpAddr,
    pub port: u16,
    pub max_body_bytes: usize,
    pub image_max_dimension: u32,
    pub image_jpeg_quality: u8,
    pub log_level: String,
    pub log_dir: PathBuf,
    /// Problems found while loading; logged once tracing is up.
    pub warnings: Vec<String>,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T, warnings: &mut Vec<String>) -> T {
    match env::var(name) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warnings.push(format!("Ignoring unparsable {}='{}'; using default.", name, value));
                default
            }
        },
        Err(_) => default,
    }
}

fn first_non_empty(values: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// `Url::join` replaces the last path segment unless the base ends with `/`.
fn parse_base_url(value: &str) -> Result<Url> {
    let trimmed = value.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).with_context(|| format!("Invalid GEMINI_BASE_URL '{value}'"))
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_api_key =
            first_non_empty(API_KEY_VARIABLES.iter().map(|name| env::var(name).ok()));

        let bind_address = env_string("BIND_ADDRESS", "0.0.0.0");
        let bind_address = bind_address
            .trim()
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid BIND_ADDRESS '{bind_address}'"))?;

        let mut image_model = env_string("GEMINI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL)
            .trim()
            .to_string();
        if image_model.is_empty() {
            image_model = DEFAULT_IMAGE_MODEL.to_string();
        }

        let mut warnings = Vec::new();
        let timeout_seconds = env_parsed("GEMINI_TIMEOUT_SECONDS", 120u64, &mut warnings);
        let port = env_parsed("PORT", 3000u16, &mut warnings);
        let max_body_bytes = env_parsed("MAX_BODY_BYTES", 20 * 1024 * 1024usize, &mut warnings);
        let image_max_dimension = env_parsed("IMAGE_MAX_DIMENSION", 0u32, &mut warnings);
        let image_jpeg_quality = env_parsed("IMAGE_JPEG_QUALITY", 85u8, &mut warnings);

        Ok(Config {
            gemini_api_key,
            gemini_image_model: image_model,
            gemini_base_url: parse_base_url(&env_string(
                "GEMINI_BASE_URL",
                DEFAULT_GEMINI_BASE_URL,
            ))?,
            gemini_timeout: Duration::from_secs(timeout_seconds.max(1)),
            bind_address,
            port,
            max_body_bytes,
            image_max_dimension,
            image_jpeg_quality: image_jpeg_quality.clamp(1, 100),
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_string("LOG_DIR", "logs")),
            warnings,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn downscale(&self) -> Option<DownscaleSettings> {
        (self.image_max_dimension > 0).then_some(DownscaleSettings {
            max_dimension: self.image_max_dimension,
            jpeg_quality: self.image_jpeg_quality,
        })
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_image_model.clone(),
            downscale: self.downscale(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            gemini_api_key: Some("key".to_string()),
            gemini_image_model: DEFAULT_IMAGE_MODEL.to_string(),
            gemini_base_url: parse_base_url(DEFAULT_GEMINI_BASE_URL).unwrap(),
            gemini_timeout: Duration::from_secs(120),
            bind_address: "127.0.0.1".parse().unwrap(),
            port: 3000,
            max_body_bytes: 1024,
            image_max_dimension: 0,
            image_jpeg_quality: 85,
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn api_key_lookup_skips_blank_values() {
        let key = first_non_empty([None, Some("   ".to_string()), Some(" abc ".to_string())]);
        assert_eq!(key.as_deref(), Some("abc"));
        assert_eq!(first_non_empty([None, Some(String::new())]), None);
    }

    #[test]
    fn unparsable_values_fall_back_and_are_reported() {
        env::set_var("RELIGHT_CONFIG_TEST_BAD_PORT", "eighty");
        env::set_var("RELIGHT_CONFIG_TEST_GOOD_PORT", " 8080 ");
        let mut warnings = Vec::new();

        assert_eq!(
            env_parsed("RELIGHT_CONFIG_TEST_BAD_PORT", 3000u16, &mut warnings),
            3000
        );
        assert_eq!(
            env_parsed("RELIGHT_CONFIG_TEST_GOOD_PORT", 3000u16, &mut warnings),
            8080
        );
        assert_eq!(
            env_parsed("RELIGHT_CONFIG_TEST_UNSET_PORT", 3000u16, &mut warnings),
            3000
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("RELIGHT_CONFIG_TEST_BAD_PORT='eighty'"));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("https://proxy.example.com/gemini").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/gemini/");
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn downscale_is_disabled_by_default() {
        let mut config = sample();
        assert!(config.downscale().is_none());

        config.image_max_dimension = 1536;
        assert_eq!(
            config.downscale(),
            Some(DownscaleSettings {
                max_dimension: 1536,
                jpeg_quality: 85,
            })
        );
    }

    #[test]
    fn gateway_settings_mirror_config() {
        let config = sample();
        let settings = config.gateway_settings();
        assert_eq!(settings.api_key.as_deref(), Some("key"));
        assert_eq!(settings.model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }
}
