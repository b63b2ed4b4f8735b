//! HTTP proxy collaborator.
//!
//! Nodes never call remote URLs themselves; they hand a fully resolved
//! [`ProxyRequest`] to an [`HttpProxy`].

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    FlowError, Result,
    workflow::actions::http_request::models::{BodyType, HttpRequestMethod},
};

/// A fully resolved request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub url: String,
    pub method: HttpRequestMethod,
    pub query_params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body_type: BodyType,
    pub body: Option<String>,
}

/// What the proxy got back from the remote server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl ProxyResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpProxy: Send + Sync {
    /// Performs the request; transport failures are `Err`, HTTP error
    /// statuses are a normal response.
    async fn send(
        &self,
        request: ProxyRequest,
    ) -> Result<ProxyResponse>;
}

/// Proxy backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestProxy {
    client: reqwest::Client,
}

impl ReqwestProxy {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|err| FlowError::Http(err.to_string()))?;
        Ok(Self {
            client,
        })
    }

    fn build_headers(request: &ProxyRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("accept"), HeaderValue::from_static("*/*"));

        if let Some(content_type) = request.body_type.content_type() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        for (key, value) in &request.headers {
            headers.insert(
                key.parse::<HeaderName>().map_err(|err| FlowError::Http(err.to_string()))?,
                value.parse().map_err(|err: InvalidHeaderValue| FlowError::Http(err.to_string()))?,
            );
        }
        Ok(headers)
    }
}

#[async_trait]
impl HttpProxy for ReqwestProxy {
    async fn send(
        &self,
        request: ProxyRequest,
    ) -> Result<ProxyResponse> {
        let method: reqwest::Method = request.method.as_ref().parse().map_err(|_| FlowError::Http(format!("invalid method '{:?}'", request.method)))?;

        let mut builder = self.client.request(method, &request.url).headers(Self::build_headers(&request)?).query(&request.query_params);
        if let (Some(body), true) = (&request.body, request.body_type != BodyType::None) {
            builder = builder.body(body.clone());
        }

        let res = builder.send().await.map_err(|err| FlowError::Http(format!("Http error: {}", err)))?;

        let status = res.status().as_u16();
        let headers: HashMap<String, String> = res.headers().iter().map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string())).collect();
        let text = res.text().await.map_err(|err| FlowError::Http(err.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProxyRequest {
        ProxyRequest {
            url: "http://localhost/api".to_string(),
            method: HttpRequestMethod::POST,
            query_params: vec![],
            headers: vec![("X-Trace".to_string(), "abc".to_string())],
            body_type: BodyType::Json,
            body: Some("{}".to_string()),
        }
    }

    #[test]
    fn test_build_headers() {
        let headers = ReqwestProxy::build_headers(&request()).unwrap();
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn test_invalid_header_name() {
        let mut req = request();
        req.headers.push(("bad header".to_string(), "v".to_string()));
        assert!(matches!(ReqwestProxy::build_headers(&req), Err(FlowError::Http(_))));
    }

    #[test]
    fn test_response_success_range() {
        let mut res = ProxyResponse {
            status: 204,
            headers: HashMap::new(),
            body: Value::Null,
        };
        assert!(res.is_success());
        res.status = 404;
        assert!(!res.is_success());
    }
}
