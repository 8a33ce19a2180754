use std::path::Path;

use serde::Deserialize;

use crate::batch::DEFAULT_BUFFER;
use crate::error::TargetError;
use crate::error_log::DEFAULT_ERROR_LOG;
use crate::schema::TranslateOptions;

/// Engine settings, read from the same flat config file that carries the
/// database connection parameters. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSettings {
    /// Batch threshold.
    #[serde(default = "default_buffer")]
    pub buffer: usize,

    /// Disable the anonymous usage ping.
    #[serde(default)]
    pub disable_collection: bool,

    /// Where failed inserts are recorded.
    #[serde(default = "default_error_log")]
    pub error_log: String,

    /// Also skip ids inserted by earlier batches of the same run.
    #[serde(default)]
    pub dedup_across_batches: bool,

    /// Embed a lexical `@key` clause in class definitions.
    #[serde(default)]
    pub declare_key: bool,

    /// Flatten nested objects into `parent__child` fields.
    #[serde(default)]
    pub flatten_records: bool,

    /// Keep everything in memory instead of writing to the database.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_buffer() -> usize {
    DEFAULT_BUFFER
}
fn default_error_log() -> String {
    DEFAULT_ERROR_LOG.into()
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
            disable_collection: false,
            error_log: default_error_log(),
            dedup_across_batches: false,
            declare_key: false,
            flatten_records: false,
            dry_run: false,
        }
    }
}

impl TargetSettings {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, TargetError> {
        let settings: Self = serde_json::from_value(value.clone()).map_err(|e| TargetError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), TargetError> {
        if self.buffer == 0 {
            return Err(TargetError::Config("buffer must be at least 1".into()));
        }
        Ok(())
    }

    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            declare_key: self.declare_key,
            flatten: self.flatten_records,
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Config file
// ════════════════════════════════════════════════════════════════

/// Load a config file as a JSON value. `.toml` files are parsed as TOML,
/// anything else as JSON.
pub fn load_config(path: &str) -> Result<serde_json::Value, TargetError> {
    let content = std::fs::read_to_string(path).map_err(|e| TargetError::Config(format!("cannot read config {path}: {e}")))?;
    let is_toml = Path::new(path).extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        parse_toml(&content).map_err(|e| TargetError::Config(format!("bad config {path}: {e}")))
    } else {
        parse_json(&content).map_err(|e| TargetError::Config(format!("bad config {path}: {e}")))
    }
}

fn parse_json(content: &str) -> Result<serde_json::Value, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("top level must be an object".into());
    }
    Ok(value)
}

fn parse_toml(content: &str) -> Result<serde_json::Value, String> {
    let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;
    serde_json::to_value(table).map_err(|e| e.to_string())
}
