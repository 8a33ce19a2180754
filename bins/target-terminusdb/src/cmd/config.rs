use clap::Args;

use target_engine::{TargetSettings, load_config};

use super::error::CliError;

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Config file (JSON, or TOML with a .toml extension)
    #[arg(short, long, env = "TARGET_TERMINUSDB_CONFIG")]
    pub config: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective — parsed config
// ═══════════════════════════════════════════════════════════════

/// The raw config file (connection parameters are read from it by the
/// store) plus the engine settings parsed out of it.
pub struct Effective {
    pub raw: serde_json::Value,
    pub settings: TargetSettings,
}

impl Effective {
    pub fn new(args: &RunArgs) -> Result<Self, CliError> {
        let raw = match args.config {
            Some(ref path) => load_config(path)?,
            None => serde_json::Value::Object(Default::default()),
        };
        let settings = TargetSettings::from_value(&raw)?;
        Ok(Self { raw, settings })
    }
}
