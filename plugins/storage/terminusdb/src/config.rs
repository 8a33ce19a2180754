// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// Connection parameters. Read from the target's flat config file;
/// keys that belong to the engine are ignored.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TerminusConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub database: String,
    #[serde(default = "default_team")]
    pub team: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_key")]
    pub key: String,
    /// Bearer token; takes precedence over `user`/`key`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Commit author recorded on every insert.
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:6363".into()
}
fn default_team() -> String {
    "admin".into()
}
fn default_user() -> String {
    "admin".into()
}
fn default_key() -> String {
    "root".into()
}
fn default_branch() -> String {
    "main".into()
}
fn default_author() -> String {
    "singer-target".into()
}
fn default_timeout_secs() -> u64 {
    300
}

impl TerminusConfig {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, target_api::DatabaseError> {
        serde_json::from_value(value.clone())
            .map_err(|e| target_api::DatabaseError::config(format!("terminusdb config: {e}")))
    }
}
