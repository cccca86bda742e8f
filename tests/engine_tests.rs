use httpmock::prelude::*;
use serde_json::json;
use taxi_dashboard::config::{RemotePolicy, TrinoSettings};
use taxi_dashboard::engine::{QueryEngine, TrinoClient};
use taxi_dashboard::error::Error;

fn settings(url: String) -> TrinoSettings {
    TrinoSettings {
        url,
        user: "analyst".into(),
        catalog: "hive".into(),
        schema: "nyc_taxi".into(),
    }
}

#[tokio::test]
async fn test_query_follows_next_uri() {
    let server = MockServer::start_async().await;
    let next = format!("{}/v1/statement/executing/q1/1", server.base_url());

    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/statement")
                .header("X-Trino-User", "analyst")
                .header("X-Trino-Catalog", "hive")
                .header("X-Trino-Schema", "nyc_taxi");
            then.status(200).json_body(json!({
                "id": "q1",
                "nextUri": next,
            }));
        })
        .await;
    let page = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/statement/executing/q1/1");
            then.status(200).json_body(json!({
                "id": "q1",
                "columns": [{ "name": "_col0", "type": "bigint" }],
                "data": [[42]],
            }));
        })
        .await;

    let engine = TrinoClient::connect(&settings(server.base_url()), &RemotePolicy::default()).unwrap();
    let rows = engine
        .query("SELECT COUNT(*) FROM nyc_taxi_aggregated")
        .await
        .unwrap();

    assert_eq!(rows.columns, vec!["_col0"]);
    assert_eq!(rows.scalar(), Some(&json!(42)));
    assert_eq!(submit.hits(), 1);
    assert_eq!(page.hits(), 1);
}

#[tokio::test]
async fn test_query_error_is_a_rejection() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/statement");
            then.status(200).json_body(json!({
                "id": "q2",
                "error": {
                    "message": "line 1:15: Table 'hive.nyc_taxi.missing' does not exist",
                    "errorName": "TABLE_NOT_FOUND",
                },
            }));
        })
        .await;

    let engine = TrinoClient::connect(&settings(server.base_url()), &RemotePolicy::default()).unwrap();
    let err = engine.execute("SELECT * FROM missing").await.unwrap_err();
    match err {
        Error::RemoteRejection { body, .. } => {
            assert!(body.starts_with("TABLE_NOT_FOUND: "));
            assert!(body.contains("does not exist"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unavailable_coordinator_is_connectivity() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/statement");
            then.status(503).body("Service Unavailable");
        })
        .await;

    let engine = TrinoClient::connect(&settings(server.base_url()), &RemotePolicy::default()).unwrap();
    let err = engine.execute("SELECT 1").await.unwrap_err();
    assert!(err.is_transient());
}
