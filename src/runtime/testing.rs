//! Mock collaborators shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    FlowError, Result, RuntimeConfig,
    model::{Environment, EnvironmentVariable, FlowModel},
    runtime::{Collaborators, ConfigSink, Context, ExportSink, ExportedFile, HttpProxy, MemEnvironmentStore, ProxyRequest, ProxyResponse, ResultSink},
    workflow::{Workflow, node::NodeResult},
};

/// Replies with a canned response and remembers every request.
#[derive(Default)]
pub struct MockProxy {
    pub response: Mutex<Option<Result<ProxyResponse>>>,
    pub requests: Mutex<Vec<ProxyRequest>>,
}

impl MockProxy {
    pub fn replying(
        status: u16,
        body: Value,
    ) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(Ok(ProxyResponse {
                status,
                headers: [("content-type".to_string(), "application/json".to_string())].into_iter().collect(),
                body,
            }))),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(Err(FlowError::Http(message.to_string())))),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> Option<ProxyRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpProxy for MockProxy {
    async fn send(
        &self,
        request: ProxyRequest,
    ) -> Result<ProxyResponse> {
        self.requests.lock().unwrap().push(request);
        self.response.lock().unwrap().clone().unwrap_or_else(|| Err(FlowError::Http("no response configured".to_string())))
    }
}

/// Records every result and patch in call order.
#[derive(Default)]
pub struct RecordingSink {
    pub results: Mutex<Vec<(String, NodeResult)>>,
    pub patches: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn statuses(
        &self,
        nid: &str,
    ) -> Vec<String> {
        self.results.lock().unwrap().iter().filter(|(id, _)| id == nid).map(|(_, r)| r.status.as_ref().to_string()).collect()
    }
}

impl ResultSink for RecordingSink {
    fn set_node_result(
        &self,
        _: &str,
        nid: &str,
        result: &NodeResult,
    ) {
        self.results.lock().unwrap().push((nid.to_string(), result.clone()));
    }
}

impl ConfigSink for RecordingSink {
    fn update_node_data(
        &self,
        _: &str,
        nid: &str,
        patch: &Value,
    ) {
        self.patches.lock().unwrap().push((nid.to_string(), patch.clone()));
    }
}

#[derive(Default)]
pub struct RecordingExportSink {
    pub files: Mutex<Vec<ExportedFile>>,
}

#[async_trait]
impl ExportSink for RecordingExportSink {
    async fn deliver(
        &self,
        file: ExportedFile,
    ) -> Result<()> {
        self.files.lock().unwrap().push(file);
        Ok(())
    }
}

pub struct Harness {
    pub ctx: Arc<Context>,
    pub proxy: Arc<MockProxy>,
    pub sink: Arc<RecordingSink>,
    pub env_store: MemEnvironmentStore,
    pub exports: Arc<RecordingExportSink>,
}

impl Harness {
    pub fn new(flow: Value) -> Self {
        Self::with(flow, vec![], MockProxy::replying(200, Value::Null))
    }

    pub fn with(
        flow: Value,
        vars: Vec<EnvironmentVariable>,
        proxy: Arc<MockProxy>,
    ) -> Self {
        Self::with_config(flow, vars, proxy, RuntimeConfig::default())
    }

    pub fn with_config(
        flow: Value,
        vars: Vec<EnvironmentVariable>,
        proxy: Arc<MockProxy>,
        config: RuntimeConfig,
    ) -> Self {
        let model: FlowModel = serde_json::from_value(flow).unwrap();
        let workflow = Arc::new(Workflow::try_from(&model).unwrap());
        let sink = Arc::new(RecordingSink::default());
        let env_store = MemEnvironmentStore::default();
        let exports = Arc::new(RecordingExportSink::default());

        let collaborators = Collaborators {
            http: proxy.clone(),
            results: sink.clone(),
            node_data: sink.clone(),
            environment: Arc::new(env_store.clone()),
            export: exports.clone(),
        };
        let ctx = Arc::new(Context::new(
            "test-run".to_string(),
            workflow,
            Arc::new(Environment::new(vars)),
            collaborators,
            Arc::new(config),
        ));

        Self {
            ctx,
            proxy,
            sink,
            env_store,
            exports,
        }
    }

    /// Execute one node through the full lifecycle, downstream included.
    pub async fn run(
        &self,
        nid: &str,
        input: Option<Value>,
    ) -> NodeResult {
        crate::dispatcher::execute_node(self.ctx.clone(), nid.to_string(), input, 0).await
    }

    pub fn result(
        &self,
        nid: &str,
    ) -> Option<NodeResult> {
        self.ctx.node_result(nid)
    }
}
