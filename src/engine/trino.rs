use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Deserialize;
use tracing::{debug, info};

use super::QueryEngine;
use super::table::{RowSet, Table, quote_ident};
use crate::config::{RemotePolicy, TrinoSettings};
use crate::error::{Error, Result};
use crate::fetch::auth::StaticHeader;
use crate::fetch::{BasicClient, HttpClient};

const SERVICE: &str = "trino";

/// Rows per multi-row INSERT statement.
pub const INSERT_CHUNK_ROWS: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    id: String,
    next_uri: Option<String>,
    columns: Option<Vec<QueryColumn>>,
    data: Option<Vec<Vec<serde_json::Value>>>,
    error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
struct QueryColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryError {
    message: String,
    error_name: Option<String>,
}

/// Client for Trino's HTTP statement protocol: `POST /v1/statement`, then
/// follow `nextUri` until the query is finished.
pub struct TrinoClient<C = StaticHeader<BasicClient>> {
    http: C,
    statement_url: Url,
    catalog: HeaderValue,
    schema: HeaderValue,
}

impl TrinoClient {
    /// Builds a client that identifies as `settings.user` and applies the
    /// policy's per-call timeout.
    pub fn connect(settings: &TrinoSettings, policy: &RemotePolicy) -> Result<Self> {
        let basic =
            BasicClient::new(policy.request_timeout).map_err(|e| Error::connectivity(SERVICE, e))?;
        let http = StaticHeader::trino_user(basic, &settings.user)?;
        Self::with_client(http, settings)
    }
}

impl<C: HttpClient> TrinoClient<C> {
    pub fn with_client(http: C, settings: &TrinoSettings) -> Result<Self> {
        let statement_url = format!("{}/v1/statement", settings.url.trim_end_matches('/'));
        let statement_url = Url::parse(&statement_url)
            .map_err(|e| Error::Config(format!("invalid Trino URL '{}': {e}", settings.url)))?;
        let header = |value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("invalid Trino session value '{value}': {e}")))
        };

        Ok(Self {
            http,
            statement_url,
            catalog: header(&settings.catalog)?,
            schema: header(&settings.schema)?,
        })
    }

    async fn send(&self, req: Request) -> Result<QueryResults> {
        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| Error::connectivity(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(Error::connectivity(
                    SERVICE,
                    format!("status {status}: {body}"),
                ));
            }
            return Err(Error::RemoteRejection {
                service: SERVICE.to_string(),
                target: "statement".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<QueryResults>()
            .await
            .map_err(|e| Error::invalid_response(SERVICE, e))
    }

    /// Submits `sql` and drains every result page.
    async fn run(&self, sql: &str) -> Result<RowSet> {
        let mut req = Request::new(Method::POST, self.statement_url.clone());
        let headers = req.headers_mut();
        headers.insert("X-Trino-Catalog", self.catalog.clone());
        headers.insert("X-Trino-Schema", self.schema.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        *req.body_mut() = Some(sql.to_string().into());

        let mut page = self.send(req).await?;
        debug!(query_id = %page.id, "Statement submitted");

        let mut rows = RowSet::default();
        loop {
            if let Some(err) = page.error {
                return Err(Error::RemoteRejection {
                    service: SERVICE.to_string(),
                    target: format!("query {}", page.id),
                    status: 200,
                    body: match err.error_name {
                        Some(name) => format!("{name}: {}", err.message),
                        None => err.message,
                    },
                });
            }
            if rows.columns.is_empty() {
                if let Some(columns) = page.columns {
                    rows.columns = columns.into_iter().map(|c| c.name).collect();
                }
            }
            if let Some(data) = page.data {
                rows.rows.extend(data);
            }

            let Some(next) = page.next_uri else {
                break;
            };
            let next = Url::parse(&next).map_err(|e| Error::invalid_response(SERVICE, e))?;
            page = self.send(Request::new(Method::GET, next)).await?;
        }

        Ok(rows)
    }
}

/// Statements that replace `table` wholesale: drop, create with typed
/// columns, then chunked multi-row inserts.
pub fn replace_statements(table: &Table, chunk_rows: usize) -> Vec<String> {
    let name = quote_ident(&table.name);
    let column_defs = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.ty))
        .collect::<Vec<_>>()
        .join(", ");
    let column_list = table
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut statements = vec![
        format!("DROP TABLE IF EXISTS {name}"),
        format!("CREATE TABLE {name} ({column_defs})"),
    ];

    for chunk in table.rows.chunks(chunk_rows.max(1)) {
        let values = chunk
            .iter()
            .map(|row| {
                let cells = row
                    .iter()
                    .map(|v| v.to_literal())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({cells})")
            })
            .collect::<Vec<_>>()
            .join(", ");
        statements.push(format!("INSERT INTO {name} ({column_list}) VALUES {values}"));
    }

    statements
}

#[async_trait]
impl<C: HttpClient> QueryEngine for TrinoClient<C> {
    #[tracing::instrument(skip(self, table), fields(table = %table.name, rows = table.rows.len()))]
    async fn replace_table(&self, table: &Table) -> Result<usize> {
        for statement in replace_statements(table, INSERT_CHUNK_ROWS) {
            self.run(&statement).await?;
        }
        info!(table = %table.name, rows = table.rows.len(), "Table replaced");
        Ok(table.rows.len())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.run(sql).await.map(|_| ())
    }

    async fn query(&self, sql: &str) -> Result<RowSet> {
        self.run(sql).await
    }
}
