// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire-level tests against an in-process fake SQL API.
//!
//! The fake server listens on `127.0.0.1:0`; the client is pointed at it via
//! `snowflake.base_url` and authenticates with the RSA fixture key.
//!
//! ```text
//! POST /api/v2/statements          -> canned submission response
//! GET  <known partition path>      -> canned partition body
//! GET  <anything else>             -> next canned status response (polling)
//! ```

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use snowflake_sql_api::error::ErrorKind;
use snowflake_sql_api::{Bindings, ClientConfig, QueryExecutor};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const PKCS8_PEM: &str = include_str!("fixtures/rsa_key.p8");
const FIXTURE_FINGERPRINT: &str = "SHA256:w5rrNM6xBH49UrdwrKmH1JghYLLt5smQgikgc3264Ls=";
const HANDLE: &str = "01b2c3d4-0000-1111-2222-333344445555";

// =============================================================================
// Fake SQL API
// =============================================================================

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path_and_query: String,
    headers: HeaderMap,
    body: Option<Value>,
}

#[derive(Clone)]
struct FakeSqlApi {
    submit: (StatusCode, String),
    /// Status poll responses in order; the last one repeats.
    status: Arc<Vec<(StatusCode, String)>>,
    /// Partition bodies keyed by path and query.
    partitions: Arc<HashMap<String, Value>>,
    /// Partition paths served with `Content-Encoding: gzip`.
    gzipped: Arc<HashSet<String>>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    polls: Arc<AtomicUsize>,
}

impl FakeSqlApi {
    fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            submit: (status, body.into()),
            status: Arc::new(Vec::new()),
            partitions: Arc::new(HashMap::new()),
            gzipped: Arc::new(HashSet::new()),
            recorded: Arc::new(Mutex::new(Vec::new())),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body.to_string())
    }

    fn with_partitions(mut self, partitions: Vec<(&str, Value)>) -> Self {
        self.partitions = Arc::new(
            partitions
                .into_iter()
                .map(|(path, body)| (path.to_string(), body))
                .collect(),
        );
        self
    }

    fn with_gzipped(mut self, paths: Vec<&str>) -> Self {
        self.gzipped = Arc::new(paths.into_iter().map(str::to_string).collect());
        self
    }

    fn with_status_responses(mut self, responses: Vec<(StatusCode, Value)>) -> Self {
        self.status = Arc::new(
            responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
        );
        self
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn record(&self, method: Method, uri: &Uri, headers: HeaderMap, body: Option<Value>) {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());
        self.recorded.lock().unwrap().push(Recorded {
            method,
            path_and_query,
            headers,
            body,
        });
    }
}

fn json_response(status: StatusCode, body: String) -> axum::response::Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn gzip_json_response(body: String) -> axum::response::Response {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        compressed,
    )
        .into_response()
}

async fn handle_submit(
    State(api): State<FakeSqlApi>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    api.record(
        Method::POST,
        &uri,
        headers,
        serde_json::from_slice(&body).ok(),
    );
    let (status, body) = api.submit.clone();
    json_response(status, body)
}

async fn handle_get(
    State(api): State<FakeSqlApi>,
    uri: Uri,
    headers: HeaderMap,
) -> axum::response::Response {
    api.record(Method::GET, &uri, headers, None);

    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    if let Some(body) = api.partitions.get(key) {
        if api.gzipped.contains(key) {
            return gzip_json_response(body.to_string());
        }
        return json_response(StatusCode::OK, body.to_string());
    }

    let poll = api.polls.fetch_add(1, Ordering::SeqCst);
    match api.status.get(poll).or_else(|| api.status.last()) {
        Some((status, body)) => json_response(*status, body.clone()),
        None => json_response(
            StatusCode::NOT_FOUND,
            json!({"code": "000404", "message": format!("no route for {}", key)}).to_string(),
        ),
    }
}

/// Serve the fake API on an ephemeral port and return its base URL.
async fn spawn_server(api: FakeSqlApi) -> String {
    let router = Router::new()
        .route("/api/v2/statements", post(handle_submit))
        .fallback(handle_get)
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// =============================================================================
// Test Helpers
// =============================================================================

fn config_for(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new();
    for (key, value) in [
        ("snowflake.account", "testacct"),
        ("snowflake.user", "test_user"),
        ("snowflake.warehouse", "COMPUTE_WH"),
        ("snowflake.database", "ANALYTICS"),
        ("snowflake.schema", "PUBLIC"),
        ("snowflake.base_url", base_url),
        ("snowflake.private_key_content", PKCS8_PEM),
        ("snowflake.poll_interval_ms", "10"),
    ] {
        config.set_option(key, value).unwrap();
    }
    config
}

async fn executor_for(api: &FakeSqlApi) -> QueryExecutor {
    let base_url = spawn_server(api.clone()).await;
    QueryExecutor::from_config(&config_for(&base_url)).unwrap()
}

fn success_body(data: Value, partition_info: Value) -> Value {
    json!({
        "statementHandle": HANDLE,
        "code": "090001",
        "message": "Statement executed successfully.",
        "statementStatusUrl": format!("/api/v2/statements/{}", HANDLE),
        "resultSetMetaData": {
            "numRows": 1,
            "format": "jsonv2",
            "rowType": [
                {"name": "ID", "type": "text", "nullable": false},
                {"name": "NAME", "type": "text", "nullable": true}
            ],
            "partitionInfo": partition_info
        },
        "data": data
    })
}

fn header_value<'a>(recorded: &'a Recorded, name: &str) -> Option<&'a str> {
    recorded.headers.get(name).and_then(|v| v.to_str().ok())
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_matches_wire_contract() {
    let api = FakeSqlApi::ok(success_body(json!([["c1", "Company 1"]]), json!([])));
    let executor = executor_for(&api).await;

    let mut bindings = Bindings::new();
    bindings.insert("1".to_string(), 5i64.into());
    bindings.insert("2".to_string(), "Company 1".into());
    bindings.insert("3".to_string(), 0.5f64.into());

    let rows = executor
        .execute_query(
            "SELECT ID, NAME FROM COMPANIES WHERE RANK < ? AND NAME = ? AND SCORE > ?",
            &bindings,
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].clone().into_json(),
        json!({"id": "c1", "name": "Company 1"})
    );

    let recorded = api.recorded();
    assert_eq!(recorded.len(), 1);
    let submit = &recorded[0];
    assert_eq!(submit.method, Method::POST);
    assert_eq!(submit.path_and_query, "/api/v2/statements");

    assert_eq!(
        header_value(submit, "x-snowflake-authorization-token-type"),
        Some("KEYPAIR_JWT")
    );
    assert_eq!(header_value(submit, "accept"), Some("application/json"));
    assert!(header_value(submit, "user-agent")
        .unwrap()
        .starts_with("snowflake-sql-api/"));

    let body = submit.body.as_ref().unwrap();
    assert_eq!(
        body["statement"],
        "SELECT ID, NAME FROM COMPANIES WHERE RANK < ? AND NAME = ? AND SCORE > ?"
    );
    assert_eq!(body["warehouse"], "COMPUTE_WH");
    assert_eq!(body["database"], "ANALYTICS");
    assert_eq!(body["schema"], "PUBLIC");
    assert_eq!(body["timeout"], 60);
    assert_eq!(body["resultSetMetaData"], json!({"format": "json"}));
    assert!(body.get("role").is_none());
    assert_eq!(
        body["bindings"],
        json!({
            "1": {"type": "FIXED", "value": "5"},
            "2": {"type": "TEXT", "value": "Company 1"},
            "3": {"type": "REAL", "value": "0.5"}
        })
    );
}

#[tokio::test]
async fn test_bearer_token_claims() {
    let api = FakeSqlApi::ok(success_body(json!([]), json!([])));
    let executor = executor_for(&api).await;
    executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap();

    let recorded = api.recorded();
    let authorization = header_value(&recorded[0], "authorization").unwrap();
    let token = authorization.strip_prefix("Bearer ").unwrap();
    let segments: Vec<&str> = token.split('.').collect();
    assert_eq!(segments.len(), 3);

    let header_json: Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[0]).unwrap()).unwrap();
    assert_eq!(header_json["alg"], "RS256");

    let claims: Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[1]).unwrap()).unwrap();
    assert_eq!(
        claims["iss"],
        format!("TESTACCT.TEST_USER.{}", FIXTURE_FINGERPRINT)
    );
    assert_eq!(claims["sub"], "TESTACCT.TEST_USER");
    let iat = claims["iat"].as_i64().unwrap();
    let exp = claims["exp"].as_i64().unwrap();
    assert_eq!(exp - iat, 59 * 60);
}

#[tokio::test]
async fn test_token_reused_across_requests() {
    let api = FakeSqlApi::ok(success_body(json!([]), json!([])));
    let executor = executor_for(&api).await;
    for _ in 0..2 {
        executor
            .execute_query("SELECT 1", &Bindings::new())
            .await
            .unwrap();
    }

    let recorded = api.recorded();
    assert_eq!(recorded.len(), 2);
    assert_eq!(
        header_value(&recorded[0], "authorization"),
        header_value(&recorded[1], "authorization")
    );
}

#[tokio::test]
async fn test_role_sent_when_configured() {
    let api = FakeSqlApi::ok(success_body(json!([]), json!([])));
    let base_url = spawn_server(api.clone()).await;
    let mut config = config_for(&base_url);
    config.set_option("snowflake.role", "ANALYST").unwrap();
    let executor = QueryExecutor::from_config(&config).unwrap();

    executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap();
    assert_eq!(api.recorded()[0].body.as_ref().unwrap()["role"], "ANALYST");
}

// =============================================================================
// Partitions
// =============================================================================

#[tokio::test]
async fn test_partition_urls_resolved_and_authenticated() {
    let partition_1 = format!("/api/v2/statements/{}?partition=1", HANDLE);
    let partition_2 = format!("/api/v2/statements/{}?partition=2", HANDLE);
    let partition_3 = format!("/api/v2/statements/{}/chunks/3", HANDLE);

    let api = FakeSqlApi::ok(success_body(
        json!([["c1", "Company 1"]]),
        json!([
            {"rowCount": 1, "uncompressedSize": 40},
            {"rowCount": 1, "url": partition_1.clone()},
            {"rowCount": 1},
            {"rowCount": 1, "url": "chunks/3"}
        ]),
    ))
    .with_partitions(vec![
        (partition_1.as_str(), json!({"data": [["c2", "Company 2"]]})),
        (partition_2.as_str(), json!({"data": [["c3", "Company 3"]]})),
        (partition_3.as_str(), json!({"data": [["c4", null]]})),
    ]);
    let executor = executor_for(&api).await;

    let rows = executor
        .execute_query("SELECT ID, NAME FROM COMPANIES", &Bindings::new())
        .await
        .unwrap();

    let ids: Vec<_> = rows.iter().map(|r| r.get_str("id").unwrap()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
    assert_eq!(rows[3].get("name"), Some(&Value::Null));

    let gets: Vec<Recorded> = api
        .recorded()
        .into_iter()
        .filter(|r| r.method == Method::GET)
        .collect();
    assert_eq!(gets.len(), 3);
    let mut paths: Vec<&str> = gets.iter().map(|r| r.path_and_query.as_str()).collect();
    paths.sort();
    let mut expected = vec![
        partition_1.as_str(),
        partition_2.as_str(),
        partition_3.as_str(),
    ];
    expected.sort();
    assert_eq!(paths, expected);

    for get in &gets {
        assert!(header_value(get, "authorization").unwrap().starts_with("Bearer "));
        assert_eq!(
            header_value(get, "x-snowflake-authorization-token-type"),
            Some("KEYPAIR_JWT")
        );
    }
}

#[tokio::test]
async fn test_gzip_encoded_partition_is_decompressed() {
    let partition_1 = format!("/api/v2/statements/{}?partition=1", HANDLE);
    let partition_2 = format!("/api/v2/statements/{}?partition=2", HANDLE);

    let api = FakeSqlApi::ok(success_body(
        json!([["c1", "Company 1"]]),
        json!([
            {"rowCount": 1},
            {"rowCount": 1, "url": partition_1.clone()},
            {"rowCount": 1, "url": partition_2.clone()}
        ]),
    ))
    .with_partitions(vec![
        (partition_1.as_str(), json!({"data": [["c2", "Company 2"]]})),
        (partition_2.as_str(), json!({"data": [["c3", "Company 3"]]})),
    ])
    .with_gzipped(vec![partition_1.as_str(), partition_2.as_str()]);
    let executor = executor_for(&api).await;

    let rows = executor
        .execute_query("SELECT ID, NAME FROM COMPANIES", &Bindings::new())
        .await
        .unwrap();

    let ids: Vec<_> = rows.iter().map(|r| r.get_str("id").unwrap()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert_eq!(rows[2].get_str("name"), Some("Company 3"));

    for get in api.recorded().iter().filter(|r| r.method == Method::GET) {
        assert!(header_value(get, "accept-encoding")
            .unwrap_or_default()
            .contains("gzip"));
    }
}

#[tokio::test]
async fn test_partition_error_fails_query() {
    let api = FakeSqlApi::ok(success_body(
        json!([["c1", "Company 1"]]),
        json!([{"rowCount": 1}, {"rowCount": 1}]),
    ))
    .with_status_responses(vec![(
        StatusCode::NOT_FOUND,
        json!({"code": "000709", "message": "Statement not found"}),
    )]);
    let executor = executor_for(&api).await;

    let err = executor
        .execute_query("SELECT ID, NAME FROM COMPANIES", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(err.code(), Some("000709"));
    assert_eq!(err.http_status(), 404);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_non_success_code_is_upstream_error() {
    let api = FakeSqlApi::ok(json!({
        "code": "390100",
        "message": "Invalid warehouse"
    }));
    let executor = executor_for(&api).await;

    let err = executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(err.code(), Some("390100"));
    assert_eq!(err.message(), "Invalid warehouse");
    assert_eq!(err.http_status(), 422);
}

#[tokio::test]
async fn test_error_body_on_unprocessable_entity() {
    let api = FakeSqlApi::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({
            "code": "002003",
            "message": "SQL compilation error: Object 'MISSING' does not exist",
            "sqlState": "02000",
            "statementHandle": HANDLE
        })
        .to_string(),
    );
    let executor = executor_for(&api).await;

    let err = executor
        .execute_query("SELECT * FROM MISSING", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(err.code(), Some("002003"));
    assert_eq!(err.sql_state(), Some("02000"));
    assert_eq!(err.upstream_http_status(), Some(422));
}

#[tokio::test]
async fn test_unparseable_server_error_is_connectivity() {
    let api = FakeSqlApi::new(StatusCode::SERVICE_UNAVAILABLE, "<html>maintenance</html>");
    let executor = executor_for(&api).await;

    let err = executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.is_transient());
    assert_eq!(err.http_status(), 503);
}

#[tokio::test]
async fn test_unauthorized_without_body_is_upstream() {
    let api = FakeSqlApi::new(StatusCode::UNAUTHORIZED, "");
    let executor = executor_for(&api).await;

    let err = executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(err.http_status(), 401);
}

#[tokio::test]
async fn test_missing_statement_handle_is_protocol_error() {
    let api = FakeSqlApi::ok(json!({
        "code": "090001",
        "resultSetMetaData": {"rowType": [{"name": "ID"}]},
        "data": [["c1"]]
    }));
    let executor = executor_for(&api).await;

    let err = executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.http_status(), 502);
}

#[tokio::test]
async fn test_bad_private_key_is_credential_error() {
    let api = FakeSqlApi::ok(success_body(json!([]), json!([])));
    let base_url = spawn_server(api.clone()).await;
    let mut config = config_for(&base_url);
    config
        .set_option("snowflake.private_key_content", "not a key")
        .unwrap();
    let executor = QueryExecutor::from_config(&config).unwrap();

    let err = executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Credential);
    assert!(!executor.check_connection().await);
    assert!(api.recorded().is_empty());
}

// =============================================================================
// Async statements
// =============================================================================

#[tokio::test]
async fn test_accepted_statement_is_polled_to_completion() {
    let running = json!({
        "code": "333334",
        "message": "Asynchronous execution in progress.",
        "statementHandle": HANDLE,
        "statementStatusUrl": format!("/api/v2/statements/{}", HANDLE)
    });
    let api = FakeSqlApi::new(StatusCode::ACCEPTED, running.to_string()).with_status_responses(
        vec![
            (StatusCode::ACCEPTED, running.clone()),
            (
                StatusCode::OK,
                success_body(json!([["c1", "Company 1"]]), json!([])),
            ),
        ],
    );
    let executor = executor_for(&api).await;

    let rows = executor
        .execute_query("SELECT ID, NAME FROM SLOW", &Bindings::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(api.polls(), 2);

    let polls: Vec<Recorded> = api
        .recorded()
        .into_iter()
        .filter(|r| r.method == Method::GET)
        .collect();
    assert!(polls
        .iter()
        .all(|r| r.path_and_query == format!("/api/v2/statements/{}", HANDLE)));
}

#[tokio::test]
async fn test_poll_timeout_is_upstream_error() {
    let running = json!({
        "code": "333334",
        "message": "Asynchronous execution in progress.",
        "statementHandle": HANDLE
    });
    let api = FakeSqlApi::new(StatusCode::ACCEPTED, running.to_string())
        .with_status_responses(vec![(StatusCode::ACCEPTED, running)]);
    let base_url = spawn_server(api.clone()).await;
    let mut config = config_for(&base_url);
    config.set_option("snowflake.poll_timeout_secs", "0").unwrap();
    let executor = QueryExecutor::from_config(&config).unwrap();

    let err = executor
        .execute_query("SELECT ID, NAME FROM SLOW", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(err.code(), Some("333334"));
}

// =============================================================================
// Connection check and lifecycle
// =============================================================================

#[tokio::test]
async fn test_check_connection() {
    let api = FakeSqlApi::ok(json!({
        "statementHandle": HANDLE,
        "code": "090001",
        "resultSetMetaData": {"numRows": 1, "rowType": [{"name": "1"}]},
        "data": [["1"]]
    }));
    let executor = executor_for(&api).await;
    assert!(executor.check_connection().await);
    assert_eq!(api.recorded()[0].body.as_ref().unwrap()["statement"], "SELECT 1");
}

#[tokio::test]
async fn test_check_connection_unreachable_host() {
    let executor = QueryExecutor::from_config(&config_for("http://127.0.0.1:1")).unwrap();
    assert!(!executor.check_connection().await);

    let err = executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
}

#[tokio::test]
async fn test_client_reopens_after_close() {
    let api = FakeSqlApi::ok(success_body(json!([["c1", "Company 1"]]), json!([])));
    let executor = executor_for(&api).await;

    executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap();
    executor.close();
    let rows = executor
        .execute_query("SELECT 1", &Bindings::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(api.recorded().len(), 2);
}
