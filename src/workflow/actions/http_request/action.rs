use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    FlowError, Result,
    runtime::{Context, ProxyRequest},
    workflow::{
        actions::{Action, ActionOutput, ActionType, NodeCall, decode},
        template::stringify,
    },
};

use super::models::*;

const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestAction {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    method: HttpRequestMethod,
    #[serde(default)]
    query_params: Vec<KeyValue>,
    #[serde(default)]
    headers: Vec<KeyValue>,
    #[serde(default)]
    body_type: BodyType,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    auth: AuthConfig,
}

impl HttpRequestAction {
    fn resolve_rows(
        ctx: &Context,
        rows: &[KeyValue],
    ) -> Vec<(String, String)> {
        rows.iter()
            .filter(|row| row.enabled && !row.key.trim().is_empty())
            .map(|row| (ctx.resolve_str(&row.key), ctx.resolve_str(&row.value)))
            .collect()
    }

    /// Add the computed authorization header or query parameter.
    fn apply_auth(
        &self,
        ctx: &Context,
        headers: &mut Vec<(String, String)>,
        query: &mut Vec<(String, String)>,
    ) {
        let field = |value: &Option<String>| ctx.resolve(value.as_deref()).unwrap_or_default();

        match self.auth.auth_type {
            AuthType::None => {}
            AuthType::Basic => {
                let credentials = format!("{}:{}", field(&self.auth.username), field(&self.auth.password));
                headers.push((AUTHORIZATION_HEADER.to_string(), format!("Basic {}", STANDARD.encode(credentials))));
            }
            AuthType::Bearer => {
                headers.push((AUTHORIZATION_HEADER.to_string(), format!("Bearer {}", field(&self.auth.token))));
            }
            AuthType::ApiKey => {
                let key = field(&self.auth.key);
                if key.is_empty() {
                    return;
                }
                let value = field(&self.auth.value);
                match self.auth.add_to {
                    ApiKeyLocation::Header => headers.push((key, value)),
                    ApiKeyLocation::Query => query.push((key, value)),
                }
            }
        }
    }

    fn build_request(
        &self,
        ctx: &Context,
    ) -> Result<ProxyRequest> {
        let url = ctx.resolve(self.url.as_deref()).unwrap_or_default();
        if url.trim().is_empty() {
            return Err(FlowError::Action("URL is required".to_string()));
        }

        let mut query_params = Self::resolve_rows(ctx, &self.query_params);
        let mut headers = Self::resolve_rows(ctx, &self.headers);
        self.apply_auth(ctx, &mut headers, &mut query_params);

        let body = match (&self.body_type, &self.body) {
            (BodyType::None, _) | (_, None) | (_, Some(Value::Null)) => None,
            (_, Some(Value::String(text))) => Some(ctx.resolve_str(text)),
            (_, Some(value)) => Some(stringify(&ctx.resolver().resolve_json_value(value))),
        };

        Ok(ProxyRequest {
            url,
            method: self.method,
            query_params,
            headers,
            body_type: self.body_type,
            body,
        })
    }
}

#[async_trait]
impl Action for HttpRequestAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        let rows = json!({
            "type": "array",
            "items": {
                "type": "object",
                "required": ["key"],
                "properties": {
                    "key": { "type": "string" },
                    "value": { "type": "string" },
                    "enabled": { "type": "boolean" }
                }
            }
        });
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Request URL, supports template variables like {{env.BASE_URL}}"
                },
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"]
                },
                "queryParams": rows,
                "headers": rows,
                "bodyType": {
                    "type": "string",
                    "enum": ["none", "json", "text", "form-urlencoded", "xml"]
                },
                "body": {
                    "description": "Request body, text or inline JSON, supports template variables"
                },
                "auth": {
                    "type": "object",
                    "properties": {
                        "type": {
                            "type": "string",
                            "enum": ["none", "basic", "bearer", "apiKey"]
                        },
                        "username": { "type": ["string", "null"] },
                        "password": { "type": ["string", "null"] },
                        "token": { "type": ["string", "null"] },
                        "key": { "type": ["string", "null"] },
                        "value": { "type": ["string", "null"] },
                        "addTo": {
                            "type": "string",
                            "enum": ["header", "query"]
                        }
                    }
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::HttpRequest
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        let request = self.build_request(&ctx)?;
        debug!(run_id = ctx.run_id(), nid = %call.nid, method = request.method.as_ref(), url = %request.url, "sending request");

        let res = ctx.http().send(request).await?;
        let status = res.status;

        let output = if res.is_success() {
            ActionOutput::success(res.body)
        } else {
            ActionOutput::failed(format!("HTTP {}", status)).with_data(res.body)
        };
        Ok(output.with_status_code(status).with_headers(res.headers))
    }
}
