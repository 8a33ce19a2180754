use target_api::DatabaseError;
use target_engine::TargetError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Target(#[from] TargetError),

    #[error("database: {0}")]
    Database(#[from] DatabaseError),

    #[error("output: {0}")]
    Output(#[from] std::io::Error),
}
