use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::session::{Credentials, SERVICE, Session};
use crate::config::{RemotePolicy, SupersetSettings};
use crate::error::{Error, Result};
use crate::fetch::{BasicClient, HttpClient};
use crate::services::dashboard_api::{
    ChartId, ChartSpec, DashboardApi, DashboardId, DashboardSpec, DatabaseId, DatabaseSpec,
    DatabaseSummary, DatasetId, DatasetSpec, DatasetSummary,
};

const PAGE_SIZE: usize = 100;

/// Rison `q` argument for a list endpoint: equality on one column, one page.
fn filter_query(column: &str, value: &str, page: usize) -> String {
    format!(
        "(filters:!((col:{column},opr:eq,value:{})),page:{page},page_size:{PAGE_SIZE})",
        rison_string(value)
    )
}

/// Quotes a rison string; `'` and `!` are escaped with `!`.
fn rison_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if matches!(c, '\'' | '!') {
            out.push('!');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[derive(Deserialize)]
struct DatasetItem {
    id: DatasetId,
    table_name: String,
    schema: Option<String>,
    #[serde(default)]
    database: Option<DatabaseRef>,
}

#[derive(Deserialize)]
struct DatabaseRef {
    id: Option<DatabaseId>,
}

impl From<DatasetItem> for DatasetSummary {
    fn from(item: DatasetItem) -> Self {
        DatasetSummary {
            id: item.id,
            table_name: item.table_name,
            schema: item.schema,
            database_id: item.database.and_then(|db| db.id),
        }
    }
}

/// [`DashboardApi`] over Superset's REST API.
pub struct SupersetClient<C = BasicClient> {
    session: Session<C>,
}

impl SupersetClient {
    /// Opens a session and authenticates with the configured credentials.
    pub async fn connect(settings: &SupersetSettings, policy: RemotePolicy) -> Result<Self> {
        let mut session = Session::new(&settings.url, policy)?;
        session
            .authenticate(&Credentials {
                username: settings.username.clone(),
                password: settings.password.clone(),
            })
            .await?;
        Ok(Self { session })
    }
}

impl<C: HttpClient> SupersetClient<C> {
    pub fn from_session(session: Session<C>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Gives access to the session so a caller can authenticate again after
    /// a token expires.
    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    async fn create(&mut self, path: &str, body: &impl serde::Serialize) -> Result<i64> {
        let body = serde_json::to_value(body)?;
        let response = self.session.request(Method::POST, path, Some(&body)).await?;
        let id = response["id"].as_i64().ok_or_else(|| {
            Error::invalid_response(SERVICE, format!("POST {path} returned no id: {response}"))
        })?;
        debug!(path, id, "Resource created");
        Ok(id)
    }

    /// Every item of `path` whose `column` equals `value`, following pages
    /// until the reported count is reached.
    async fn list_matching<T: serde::de::DeserializeOwned>(
        &mut self,
        path: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<T>> {
        let mut found = Vec::new();
        let mut page = 0;
        loop {
            let target = self.list_target(path, &filter_query(column, value, page))?;
            let response = self.session.request(Method::GET, &target, None).await?;
            let items = match response.get("result") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(Error::invalid_response(
                        SERVICE,
                        format!("GET {path} returned no result list: {response}"),
                    ));
                }
            };
            let fetched = items.len();
            for item in items {
                let parsed = T::deserialize(item).map_err(|e| {
                    Error::invalid_response(SERVICE, format!("GET {path} returned {item}: {e}"))
                })?;
                found.push(parsed);
            }

            let total = response["count"].as_u64().unwrap_or(0) as usize;
            page += 1;
            if fetched == 0 || page * PAGE_SIZE >= total {
                debug!(path, column, value, matches = found.len(), "Listed resources");
                return Ok(found);
            }
        }
    }

    /// Path plus a percent-encoded `q` argument, relative to the session base.
    fn list_target(&self, path: &str, query: &str) -> Result<String> {
        let mut url = Url::parse(&format!("{}{path}", self.session.base_url()))
            .map_err(|e| Error::Config(format!("invalid Superset path '{path}': {e}")))?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(format!("{}?{}", path, url.query().unwrap_or_default()))
    }
}

#[async_trait]
impl<C: HttpClient> DashboardApi for SupersetClient<C> {
    async fn create_database(&mut self, spec: &DatabaseSpec) -> Result<DatabaseId> {
        self.create("/api/v1/database/", spec).await.map(DatabaseId)
    }

    async fn find_databases(&mut self, database_name: &str) -> Result<Vec<DatabaseSummary>> {
        self.list_matching("/api/v1/database/", "database_name", database_name)
            .await
    }

    async fn create_dataset(&mut self, spec: &DatasetSpec) -> Result<DatasetId> {
        self.create("/api/v1/dataset/", spec).await.map(DatasetId)
    }

    async fn find_datasets(&mut self, table_name: &str) -> Result<Vec<DatasetSummary>> {
        let items: Vec<DatasetItem> = self
            .list_matching("/api/v1/dataset/", "table_name", table_name)
            .await?;
        Ok(items.into_iter().map(DatasetSummary::from).collect())
    }

    async fn create_chart(&mut self, spec: &ChartSpec) -> Result<ChartId> {
        self.create("/api/v1/chart/", spec).await.map(ChartId)
    }

    async fn create_dashboard(&mut self, spec: &DashboardSpec) -> Result<DashboardId> {
        self.create("/api/v1/dashboard/", spec).await.map(DashboardId)
    }

    fn dashboard_url(&self, id: DashboardId) -> Option<String> {
        Some(format!("{}/superset/dashboard/{}/", self.session.base_url(), id))
    }
}
