mod config;

use reqwest::{Method, RequestBuilder, StatusCode};

use target_api::{DatabaseError, DocumentStore, GraphType, StoreFuture};

pub use config::TerminusConfig;

fn segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// TerminusDB document store over the HTTP API.
///
/// Only two endpoints are used: `/api/db` to check for (and create) the
/// database, and `/api/document` to insert or replace documents.
pub struct TerminusClient {
    http: reqwest::Client,
    config: TerminusConfig,
    base_url: String,
}

impl std::fmt::Debug for TerminusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminusClient")
            .field("base_url", &self.base_url)
            .field("team", &self.config.team)
            .field("database", &self.config.database)
            .field("branch", &self.config.branch)
            .finish()
    }
}

impl TerminusClient {
    pub fn new(config: TerminusConfig) -> Result<Self, DatabaseError> {
        if config.database.is_empty() {
            return Err(DatabaseError::config("database must not be empty"));
        }
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DatabaseError::config(format!("HTTP client: {e}")))?;
        let base_url = config.endpoint.trim_end_matches('/').to_string();
        Ok(Self { http, config, base_url })
    }

    /// Connect to the configured database, creating it when it does not
    /// exist yet. Returns the client and a human-readable status message.
    pub async fn connect(config: TerminusConfig) -> Result<(Self, String), DatabaseError> {
        let client = Self::new(config)?;
        let db = client.config.database.clone();

        let resp = client
            .request(Method::GET, &client.db_url())
            .send()
            .await
            .map_err(|e| DatabaseError::io(format!("connect {}: {e}", client.base_url)))?;

        match resp.status() {
            s if s.is_success() => Ok((client, format!("Connected to {db} database."))),
            StatusCode::NOT_FOUND => {
                client.create_database().await?;
                Ok((client, format!("{db} created.")))
            }
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(DatabaseError::rejected(s.as_u16(), body).with_context(format!("connect {db}")))
            }
        }
    }

    pub fn db_url(&self) -> String {
        format!("{}/api/db/{}/{}", self.base_url, segment(&self.config.team), segment(&self.config.database))
    }

    pub fn document_url(&self) -> String {
        format!(
            "{}/api/document/{}/{}/local/branch/{}",
            self.base_url,
            segment(&self.config.team),
            segment(&self.config.database),
            segment(&self.config.branch),
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.http.request(method, url);
        match self.config.token {
            Some(ref token) => req.bearer_auth(token),
            None => req.basic_auth(&self.config.user, Some(&self.config.key)),
        }
    }

    async fn create_database(&self) -> Result<(), DatabaseError> {
        let db = &self.config.database;
        let body = serde_json::json!({
            "label": db,
            "comment": format!("{db} created by Singer.io target"),
            "schema": true,
        });
        self.send_json(Method::POST, &self.db_url(), &[], &body)
            .await
            .map_err(|e| e.with_context(format!("create database {db}")))?;
        tracing::info!(database = %db, "database created");
        Ok(())
    }

    async fn send_json(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<String, DatabaseError> {
        let bytes = serde_json::to_vec(body)?;
        let resp = self
            .request(method, url)
            .query(query)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes)
            .send()
            .await
            .map_err(|e| DatabaseError::io(format!("TerminusDB request: {e}")))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| DatabaseError::io(format!("TerminusDB read: {e}")))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(DatabaseError::rejected(status.as_u16(), text))
        }
    }
}

impl DocumentStore for TerminusClient {
    fn update_document<'a>(
        &'a self,
        documents: &'a serde_json::Value,
        commit_message: &'a str,
        graph: GraphType,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let query = [
                ("graph_type", graph.as_str()),
                ("author", self.config.author.as_str()),
                ("message", commit_message),
                ("create", "true"),
            ];
            self.send_json(Method::PUT, &self.document_url(), &query, documents).await?;
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "terminusdb"
    }
}
