use api_types::report::ExportFormat;
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_PATH: &str = "config/reports.toml";
const ENV_PREFIX: &str = "REPORTS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Applied to every backend call, export downloads included.
    pub request_timeout_secs: u64,
    pub default_export_format: ExportFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
            default_export_format: ExportFormat::Excel,
        }
    }
}

/// Read the optional TOML file at `path` (or [`DEFAULT_CONFIG_PATH`]), then
/// `REPORTS_*` environment variables on top.
pub fn load(path: Option<&str>) -> Result<ClientConfig> {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));
    let settings: ClientConfig = builder.build()?.try_deserialize()?;

    tracing::debug!(
        "report client config: base_url={} timeout={}s",
        settings.base_url,
        settings.request_timeout_secs
    );
    Ok(settings)
}
