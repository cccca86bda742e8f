#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use taxi_dashboard::engine::{QueryEngine, RowSet, Table};
use taxi_dashboard::error::{Error, Result};
use taxi_dashboard::services::dashboard_api::{
    ChartId, ChartSpec, DashboardApi, DashboardId, DashboardSpec, DatabaseId, DatabaseSpec,
    DatabaseSummary, DatasetId, DatasetSpec, DatasetSummary,
};

#[derive(Default)]
pub struct DashboardState {
    pub calls: Vec<String>,
    pub databases: Vec<DatabaseSummary>,
    pub datasets: Vec<DatasetSummary>,
    pub charts: Vec<ChartSpec>,
    pub dashboards: Vec<DashboardSpec>,
    pub reject_charts: Vec<String>,
    /// Chart names whose next creation fails with the given error; each
    /// entry is consumed by the failure.
    pub fail_chart_once: Vec<(String, Error)>,
    pub fail_database: bool,
    pub fail_dataset: bool,
    /// Names passed to `create_chart`, including failed attempts.
    pub chart_attempts: Vec<String>,
    next_id: i64,
}

impl DashboardState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }
}

/// In-memory dashboard service. Clones share state, so a test can keep one
/// handle and give the other to the orchestrator.
#[derive(Clone, Default)]
pub struct MockDashboard {
    pub state: Arc<Mutex<DashboardState>>,
}

impl MockDashboard {
    pub fn rejecting(charts: &[&str]) -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().reject_charts = charts.iter().map(|c| c.to_string()).collect();
        mock
    }

    pub fn failing_database() -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().fail_database = true;
        mock
    }

    pub fn failing_dataset() -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().fail_dataset = true;
        mock
    }

    /// The next creation of `chart` fails with `error`; later ones succeed.
    pub fn failing_chart_once(chart: &str, error: Error) -> Self {
        let mock = Self::default();
        mock.state
            .lock()
            .unwrap()
            .fail_chart_once
            .push((chart.to_string(), error));
        mock
    }

    pub fn chart_attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().chart_attempts.clone()
    }

    pub fn with_existing(database: DatabaseSummary, dataset: Option<DatasetSummary>) -> Self {
        let mock = Self::default();
        {
            let mut state = mock.state.lock().unwrap();
            state.next_id = 100;
            state.databases.push(database);
            state.datasets.extend(dataset);
        }
        mock
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state.lock().unwrap().count(call)
    }
}

#[async_trait]
impl DashboardApi for MockDashboard {
    async fn create_database(&mut self, spec: &DatabaseSpec) -> Result<DatabaseId> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_database".into());
        if state.fail_database {
            return Err(Error::Connectivity {
                service: "superset".into(),
                message: "connection refused".into(),
            });
        }
        let id = DatabaseId(state.next_id());
        state.databases.push(DatabaseSummary {
            id,
            database_name: spec.database_name.clone(),
        });
        Ok(id)
    }

    async fn find_databases(&mut self, database_name: &str) -> Result<Vec<DatabaseSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("find_databases".into());
        Ok(state
            .databases
            .iter()
            .filter(|d| d.database_name == database_name)
            .cloned()
            .collect())
    }

    async fn create_dataset(&mut self, spec: &DatasetSpec) -> Result<DatasetId> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_dataset".into());
        if state.fail_dataset {
            return Err(Error::RemoteRejection {
                service: "superset".into(),
                target: "POST /api/v1/dataset/".into(),
                status: 422,
                body: r#"{"message":{"table_name":["Table does not exist"]}}"#.into(),
            });
        }
        let id = DatasetId(state.next_id());
        state.datasets.push(DatasetSummary {
            id,
            table_name: spec.table_name.clone(),
            schema: Some(spec.schema.clone()),
            database_id: Some(spec.database),
        });
        Ok(id)
    }

    async fn find_datasets(&mut self, table_name: &str) -> Result<Vec<DatasetSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("find_datasets".into());
        Ok(state
            .datasets
            .iter()
            .filter(|d| d.table_name == table_name)
            .cloned()
            .collect())
    }

    async fn create_chart(&mut self, spec: &ChartSpec) -> Result<ChartId> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_chart".into());
        state.chart_attempts.push(spec.slice_name.clone());
        if let Some(pos) = state
            .fail_chart_once
            .iter()
            .position(|(name, _)| name == &spec.slice_name)
        {
            let (_, error) = state.fail_chart_once.remove(pos);
            return Err(error);
        }
        if state.reject_charts.contains(&spec.slice_name) {
            return Err(Error::RemoteRejection {
                service: "superset".into(),
                target: "POST /api/v1/chart/".into(),
                status: 422,
                body: format!(r#"{{"message":"invalid params for {}"}}"#, spec.slice_name),
            });
        }
        state.charts.push(spec.clone());
        Ok(ChartId(state.next_id()))
    }

    async fn create_dashboard(&mut self, spec: &DashboardSpec) -> Result<DashboardId> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_dashboard".into());
        state.dashboards.push(spec.clone());
        Ok(DashboardId(state.next_id()))
    }
}

#[derive(Default)]
pub struct EngineState {
    pub tables: HashMap<String, Table>,
    pub executed: Vec<String>,
    pub queries: Vec<String>,
    /// Canned answers: the first entry whose key the query contains wins.
    pub answers: Vec<(String, RowSet)>,
    /// Statements containing any of these fragments fail.
    pub failing: Vec<String>,
}

/// In-memory query engine that records every statement it is given.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    pub state: Arc<Mutex<EngineState>>,
}

impl MemoryEngine {
    pub fn answer(&self, fragment: &str, rows: RowSet) {
        self.state
            .lock()
            .unwrap()
            .answers
            .push((fragment.to_string(), rows));
    }

    pub fn fail_on(&self, fragment: &str) {
        self.state.lock().unwrap().failing.push(fragment.to_string());
    }

    pub fn table(&self, name: &str) -> Option<Table> {
        self.state.lock().unwrap().tables.get(name).cloned()
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }
}

fn rejected(sql: &str) -> Error {
    Error::RemoteRejection {
        service: "trino".into(),
        target: "statement".into(),
        status: 200,
        body: format!("cannot run: {sql}"),
    }
}

#[async_trait]
impl QueryEngine for MemoryEngine {
    async fn replace_table(&self, table: &Table) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.failing.iter().any(|f| table.name.contains(f.as_str())) {
            return Err(rejected(&table.name));
        }
        state.tables.insert(table.name.clone(), table.clone());
        Ok(table.rows.len())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing.iter().any(|f| sql.contains(f.as_str())) {
            return Err(rejected(sql));
        }
        state.executed.push(sql.to_string());
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<RowSet> {
        let mut state = self.state.lock().unwrap();
        if state.failing.iter().any(|f| sql.contains(f.as_str())) {
            return Err(rejected(sql));
        }
        state.queries.push(sql.to_string());
        Ok(state
            .answers
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

pub fn scalar(value: serde_json::Value) -> RowSet {
    RowSet {
        columns: vec!["_col0".to_string()],
        rows: vec![vec![value]],
    }
}

pub fn fixture(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}
