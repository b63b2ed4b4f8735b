//! Whole-graph runs through the public engine API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nodeflow::{
    EngineBuilder, Environment, EnvironmentSink, EnvironmentVariable, ExportSink, ExportedFile, FlowError, FlowModel, HttpProxy, MemEnvironmentStore, NodeResult,
    NodeStatus, ProxyRequest, ProxyResponse, Result, ResultSink, Workflow,
};
use serde_json::{Value, json};

struct StaticProxy {
    status: u16,
    body: Value,
    requests: Mutex<Vec<ProxyRequest>>,
}

impl StaticProxy {
    fn new(
        status: u16,
        body: Value,
    ) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HttpProxy for StaticProxy {
    async fn send(
        &self,
        request: ProxyRequest,
    ) -> Result<ProxyResponse> {
        if request.url.contains("unreachable") {
            return Err(FlowError::Http("connection refused".to_string()));
        }
        self.requests.lock().unwrap().push(request);
        Ok(ProxyResponse {
            status: self.status,
            headers: Default::default(),
            body: self.body.clone(),
        })
    }
}

/// Keeps every recorded result in order.
#[derive(Default)]
struct Trace {
    entries: Mutex<Vec<(String, NodeResult)>>,
}

impl Trace {
    /// `(node, data)` of every success, in the order they were recorded.
    fn successes(&self) -> Vec<(String, Value)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.status == NodeStatus::Success)
            .map(|(nid, r)| (nid.clone(), r.data.clone().unwrap_or_default()))
            .collect()
    }

    fn touched(
        &self,
        nid: &str,
    ) -> bool {
        self.entries.lock().unwrap().iter().any(|(id, r)| id == nid && r.status != NodeStatus::Idle)
    }
}

impl ResultSink for Trace {
    fn set_node_result(
        &self,
        _: &str,
        nid: &str,
        result: &NodeResult,
    ) {
        self.entries.lock().unwrap().push((nid.to_string(), result.clone()));
    }
}

#[derive(Default)]
struct Downloads {
    files: Mutex<Vec<ExportedFile>>,
}

#[async_trait]
impl ExportSink for Downloads {
    async fn deliver(
        &self,
        file: ExportedFile,
    ) -> Result<()> {
        self.files.lock().unwrap().push(file);
        Ok(())
    }
}

struct Setup {
    engine: nodeflow::Engine,
    trace: Arc<Trace>,
    store: MemEnvironmentStore,
    downloads: Arc<Downloads>,
}

fn setup(proxy: Arc<StaticProxy>) -> Setup {
    let trace = Arc::new(Trace::default());
    let store = MemEnvironmentStore::default();
    let downloads = Arc::new(Downloads::default());
    let engine = EngineBuilder::new()
        .http_proxy(proxy)
        .result_sink(trace.clone())
        .environment_sink(Arc::new(store.clone()))
        .export_sink(downloads.clone())
        .build()
        .unwrap();
    Setup {
        engine,
        trace,
        store,
        downloads,
    }
}

fn workflow(flow: Value) -> Arc<Workflow> {
    let model = FlowModel::from_json(&flow.to_string()).unwrap();
    Arc::new(Workflow::try_from(&model).unwrap())
}

#[tokio::test]
async fn test_end_to_end_http_select_variable_json() {
    let proxy = StaticProxy::new(200, json!({ "id": 5 }));
    let s = setup(proxy.clone());
    let wf = workflow(json!({
        "nodes": [
            { "id": "A", "type": "http-request", "data": { "url": "{{env.BASE}}/item", "method": "GET" } },
            { "id": "B", "type": "select-fields", "data": { "paths": [{ "path": "$.id", "enabled": true }] } },
            { "id": "C", "type": "variable-set", "data": { "variableName": "x", "variableValue": "{{B::$}}", "target": "flowContext" } },
            { "id": "D", "type": "json", "data": {} }
        ],
        "edges": [
            { "id": "ab", "source": "A", "target": "B", "sourceHandle": "output" },
            { "id": "bc", "source": "B", "target": "C", "sourceHandle": "output" },
            { "id": "cd", "source": "C", "target": "D", "sourceHandle": "output" }
        ]
    }));

    let report = s.engine.run_flow(wf, Environment::new(vec![EnvironmentVariable::new("BASE", "http://api")])).await;

    assert_eq!(report.result("A").unwrap().data, Some(json!({ "id": 5 })));
    assert_eq!(report.result("B").unwrap().data, Some(json!([5])));
    assert_eq!(report.result("D").unwrap().data, Some(json!("5")));
    assert_eq!(report.context.get("x"), Some(&json!("5")));
    assert_eq!(proxy.requests.lock().unwrap()[0].url, "http://api/item");
}

#[tokio::test]
async fn test_environment_and_context_are_separate() {
    let s = setup(StaticProxy::new(200, json!(null)));
    let wf = workflow(json!({
        "nodes": [
            { "id": "save", "type": "variable-set", "data": { "variableName": "token", "variableValue": "t1", "target": "selectedEnvironment" } },
            { "id": "read_env", "type": "json", "data": {} },
            { "id": "set", "type": "variable-set", "data": { "variableName": "local", "variableValue": "l1" } },
            { "id": "read_ctx", "type": "variable-set", "data": { "variableName": "probe", "variableValue": "{{context.local}}|{{context.token}}" } }
        ],
        "edges": [
            { "id": "e1", "source": "save", "target": "read_env" },
            { "id": "e2", "source": "set", "target": "read_ctx" }
        ]
    }));

    let report = s.engine.run_flow(wf, Environment::default()).await;

    assert!(!report.context.contains_key("token"));
    assert_eq!(report.context.get("probe"), Some(&json!("l1|{{context.token}}")));

    let saved = s.store.variables();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].key, "token");
    assert_eq!(saved[0].value, "t1");

    // the next run sees the persisted variable through the environment only
    let wf = workflow(json!({
        "nodes": [{ "id": "j", "type": "json", "data": { "jsonData": "\"{{env.token}}\"" } }],
        "edges": []
    }));
    let report = s.engine.run_flow(wf, s.store.snapshot()).await;
    assert_eq!(report.result("j").unwrap().data, Some(json!("t1")));
}

#[tokio::test]
async fn test_conditional_fires_only_first_match() {
    let s = setup(StaticProxy::new(200, json!(null)));
    let wf = workflow(json!({
        "nodes": [
            { "id": "start", "type": "json", "data": { "jsonData": "{\"n\": 1}" } },
            { "id": "cond", "type": "conditional", "data": { "conditions": [
                { "expression": "{{start::$.n}}", "outputHandleId": "h1" },
                { "expression": "true", "outputHandleId": "h2" }
            ] } },
            { "id": "one", "type": "json", "data": {} },
            { "id": "two", "type": "json", "data": {} }
        ],
        "edges": [
            { "id": "e0", "source": "start", "target": "cond" },
            { "id": "e1", "source": "cond", "target": "one", "sourceHandle": "h1" },
            { "id": "e2", "source": "cond", "target": "two", "sourceHandle": "h2" }
        ]
    }));

    let report = s.engine.run_flow(wf, Environment::default()).await;

    assert_eq!(report.status("one"), NodeStatus::Success);
    assert_eq!(report.status("two"), NodeStatus::Idle);
    assert!(!s.trace.touched("two"));
}

#[tokio::test]
async fn test_loop_body_completes_before_next_item() {
    let s = setup(StaticProxy::new(200, json!(null)));
    let wf = workflow(json!({
        "nodes": [
            { "id": "start", "type": "json", "data": { "jsonData": { "rows": ["a", "b"] } } },
            { "id": "loop", "type": "loop", "data": { "inputArrayPath": "$.rows" } },
            { "id": "wait", "type": "delay", "data": { "delayMs": 10 } },
            { "id": "tag", "type": "transform", "data": { "mappings": [{ "inputPath": "$", "outputPath": "item" }] } },
            { "id": "done", "type": "json", "data": {} }
        ],
        "edges": [
            { "id": "e0", "source": "start", "target": "loop" },
            { "id": "e1", "source": "loop", "target": "wait", "sourceHandle": "loopBody" },
            { "id": "e2", "source": "wait", "target": "tag" },
            { "id": "e3", "source": "loop", "target": "done", "sourceHandle": "loopEnd" }
        ]
    }));

    let report = s.engine.run_flow(wf, Environment::default()).await;

    assert_eq!(
        s.trace.successes(),
        vec![
            ("start".to_string(), json!({ "rows": ["a", "b"] })),
            ("wait".to_string(), json!("a")),
            ("tag".to_string(), json!({ "item": "a" })),
            ("wait".to_string(), json!("b")),
            ("tag".to_string(), json!({ "item": "b" })),
            ("loop".to_string(), json!({ "itemCount": 2 })),
            ("done".to_string(), json!({ "rows": ["a", "b"] })),
        ]
    );
    assert_eq!(report.result("done").unwrap().data, Some(json!({ "rows": ["a", "b"] })));
}

#[tokio::test]
async fn test_failure_only_stops_own_branch() {
    let s = setup(StaticProxy::new(200, json!({ "ok": true })));
    let wf = workflow(json!({
        "nodes": [
            { "id": "bad", "type": "http-request", "data": { "url": "http://unreachable" } },
            { "id": "after_bad", "type": "json", "data": {} },
            { "id": "good", "type": "http-request", "data": { "url": "http://api" } },
            { "id": "after_good", "type": "json", "data": {} }
        ],
        "edges": [
            { "id": "e1", "source": "bad", "target": "after_bad" },
            { "id": "e2", "source": "good", "target": "after_good" }
        ]
    }));

    let report = s.engine.run_flow(wf, Environment::default()).await;

    assert_eq!(report.status("bad"), NodeStatus::Error);
    assert_eq!(report.result("bad").unwrap().error.as_deref(), Some("connection refused"));
    assert_eq!(report.status("after_bad"), NodeStatus::Idle);
    assert!(!s.trace.touched("after_bad"));
    assert_eq!(report.result("after_good").unwrap().data, Some(json!({ "ok": true })));
}

#[tokio::test]
async fn test_invalid_config_fails_only_its_node() {
    let s = setup(StaticProxy::new(200, json!(null)));
    let wf = workflow(json!({
        "nodes": [
            { "id": "good", "type": "json", "data": { "jsonData": "{\"ok\": true}" } },
            { "id": "bad", "type": "http-request", "data": { "url": "http://api", "method": "get" } },
            { "id": "after_bad", "type": "json", "data": {} }
        ],
        "edges": [{ "id": "e1", "source": "bad", "target": "after_bad" }]
    }));

    let report = s.engine.run_flow(wf, Environment::default()).await;

    assert_eq!(report.result("good").unwrap().data, Some(json!({ "ok": true })));
    assert_eq!(report.status("bad"), NodeStatus::Error);
    assert!(report.result("bad").unwrap().error.as_ref().unwrap().starts_with("invalid http-request config"));
    assert!(!s.trace.touched("after_bad"));
}

#[tokio::test]
async fn test_execute_single_node_drives_downstream() {
    let s = setup(StaticProxy::new(200, json!(null)));
    let wf = workflow(json!({
        "nodes": [
            { "id": "first", "type": "json", "data": { "jsonData": "[1, 2]" } },
            { "id": "middle", "type": "json", "data": { "jsonData": "[{\"v\": 3}]" } },
            { "id": "export", "type": "export", "data": { "format": "csv", "fileName": "rows" } }
        ],
        "edges": [
            { "id": "e1", "source": "first", "target": "middle" },
            { "id": "e2", "source": "middle", "target": "export" }
        ]
    }));

    let report = s.engine.execute_single_node(wf, Environment::default(), "middle").await.unwrap();

    assert!(report.result("first").is_none());
    assert_eq!(report.result("middle").unwrap().data, Some(json!([{ "v": 3 }])));
    assert_eq!(report.result("export").unwrap().data, Some(json!({ "exportedFormat": "csv", "fileName": "rows.csv", "recordCount": 1 })));

    let files = s.downloads.files.lock().unwrap();
    assert_eq!(files[0].content, "v\n3");
}

#[tokio::test]
async fn test_unknown_single_node() {
    let s = setup(StaticProxy::new(200, json!(null)));
    let wf = workflow(json!({ "nodes": [], "edges": [] }));

    let ret = s.engine.execute_single_node(wf, Environment::default(), "ghost").await;
    assert!(matches!(ret, Err(FlowError::Node(_))));
}

#[test]
fn test_environment_sink_upserts() {
    let store = MemEnvironmentStore::new(vec![EnvironmentVariable::new("A", "old").disabled()]);
    store
        .commit(&nodeflow::SaveToEnvironment {
            variable_name: "A".to_string(),
            value: "new".to_string(),
            is_secret: true,
        })
        .unwrap();

    let env = store.snapshot();
    assert_eq!(env.get("A"), Some("new"));
}
