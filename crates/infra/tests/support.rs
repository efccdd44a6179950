//! Shared helpers for the integration tests: a mock RTM server and a client
//! wired to it with a virtual clock.

use std::sync::Arc;

use rtm_common::testing::MockClock;
use rtm_domain::Credentials;
use rtm_infra::RtmClient;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "abc123";
pub const SHARED_SECRET: &str = "BANANAS";
pub const TOKEN: &str = "tok-123";
pub const TIMELINE: &str = "tl-1";

/// Route test logs through the test harness writer; `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rtm_infra=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

pub fn credentials() -> Credentials {
    Credentials::new(API_KEY, SHARED_SECRET).expect("credentials should be valid")
}

/// Client with an explicit token, pointed at `server`.
pub fn client(server: &MockServer, clock: &MockClock) -> RtmClient {
    client_with(server, clock, credentials().with_token(TOKEN))
}

pub fn client_with(server: &MockServer, clock: &MockClock, credentials: Credentials) -> RtmClient {
    init_tracing();
    RtmClient::builder()
        .base_url(&server.uri())
        .credentials(credentials)
        .clock(Arc::new(clock.clone()))
        .build()
        .expect("client should build")
}

/// `{"rsp": {"stat": "ok", ...payload}}`
pub fn ok(payload: Value) -> ResponseTemplate {
    let mut rsp = json!({ "stat": "ok" });
    if let (Some(rsp), Value::Object(extra)) = (rsp.as_object_mut(), payload) {
        rsp.extend(extra);
    }
    ResponseTemplate::new(200).set_body_json(json!({ "rsp": rsp }))
}

/// `{"rsp": {"stat": "fail", "err": {...}}}`
pub fn fail(code: &str, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "rsp": { "stat": "fail", "err": { "code": code, "msg": msg } } }))
}

/// Respond to `rtm.timelines.create`, expecting exactly `times` calls.
pub async fn mount_timeline(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(query_param("method", "rtm.timelines.create"))
        .respond_with(ok(json!({ "timeline": TIMELINE })))
        .expect(times)
        .mount(server)
        .await;
}

/// Acknowledge any POST of `rtm_method`.
pub async fn mount_mutation(server: &MockServer, rtm_method: &str) {
    Mock::given(method("POST"))
        .and(query_param("method", rtm_method))
        .respond_with(ok(json!({ "transaction": { "id": "1", "undoable": "0" } })))
        .mount(server)
        .await;
}

/// A `tasks` payload with one list holding one series.
pub fn task_list(name: &str) -> Value {
    json!({
        "tasks": {
            "rev": "r1",
            "list": [{
                "id": "100",
                "taskseries": [{
                    "id": "200",
                    "name": name,
                    "priority": "N",
                    "task": [{ "id": "300", "due": "", "completed": "", "priority": "N" }]
                }]
            }]
        }
    })
}

/// Values of `key` in the query of every request received so far.
pub async fn query_values(server: &MockServer, key: &str) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| {
            request.url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
        })
        .collect()
}
