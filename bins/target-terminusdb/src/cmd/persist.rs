use std::io::Write;
use std::sync::Arc;

use storage_memory::MemoryStore;
use storage_terminusdb::{TerminusClient, TerminusConfig};
use target_api::DocumentStore;
use target_engine::{RunSummary, Target, emit_state};

use super::config::Effective;
use super::error::CliError;
use super::usage::spawn_usage_ping;

pub async fn run(eff: &Effective) -> Result<(), CliError> {
    if !eff.settings.disable_collection {
        tracing::info!(
            "Sending version information to singer.io. To disable sending anonymous usage data, \
             set the config parameter \"disable_collection\" to true"
        );
        spawn_usage_ping();
    }

    let store = open_store(eff).await?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let summary = Target::new(store, &eff.settings).persist_lines(stdin).await?;

    if summary.batches_failed > 0 {
        tracing::warn!(
            batches = summary.batches_failed,
            documents = summary.documents_dropped,
            error_log = %eff.settings.error_log,
            "some batches were dropped"
        );
    }

    let mut out = std::io::stdout().lock();
    emit_state(&mut out, summary.state.as_ref())?;
    write_status(&mut out, &summary)?;
    Ok(())
}

async fn open_store(eff: &Effective) -> Result<Arc<dyn DocumentStore>, CliError> {
    if eff.settings.dry_run {
        tracing::info!("dry run, documents are kept in memory");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let config = TerminusConfig::from_value(&eff.raw)?;
    let (client, message) = TerminusClient::connect(config).await?;
    tracing::info!(client = ?client, "{message}");
    Ok(Arc::new(client))
}

/// Status lines printed after the state line.
fn write_status<W: Write>(out: &mut W, summary: &RunSummary) -> std::io::Result<()> {
    if summary.schemas_inserted > 0 {
        writeln!(out, "Schema inserted")?;
    }
    if summary.documents_inserted > 0 {
        writeln!(out, "Documents inserted")?;
    }
    out.flush()
}
