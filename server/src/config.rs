use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use platform_db::DatabaseSettings;
use serde::{Deserialize, Deserializer};

use crate::http::{ServeConfig, TlsFiles};

/// On-disk service configuration. Keys keep the PascalCase layout existing
/// deployments already ship.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppConfig {
    #[serde(default)]
    pub db_connection_string: String,
    #[serde(default)]
    pub logger_path: String,
    pub server: ServerConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub address: String,
    #[serde(deserialize_with = "port_from_text_or_number")]
    pub port: u16,
    #[serde(rename = "TLS", default)]
    pub tls: bool,
    #[serde(default)]
    pub certificate_path: String,
    #[serde(default)]
    pub key_path: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot open configuration file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("cannot read configuration file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.tls
            && (self.server.certificate_path.trim().is_empty()
                || self.server.key_path.trim().is_empty())
        {
            return Err(anyhow!("TLS enabled but CertificatePath or KeyPath is empty"));
        }
        Ok(())
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        let trimmed = self.logger_path.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    pub fn database_settings(&self) -> DatabaseSettings {
        DatabaseSettings::new(self.db_connection_string.clone())
    }

    pub fn serve_config(&self) -> ServeConfig {
        let tls = self.server.tls.then(|| TlsFiles {
            certificate: PathBuf::from(&self.server.certificate_path),
            key: PathBuf::from(&self.server.key_path),
        });
        ServeConfig::new(self.server.address.clone(), self.server.port, tls)
    }
}

fn port_from_text_or_number<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port {text:?}"))),
    }
}
