//! Reqwest-based client for the remote evaluation service.
//!
//! Every call is a single POST carrying the code, its variable bindings and the
//! execution mode. A `sync` call finishes its remote side effects before the
//! response arrives, so code it defines (functions, imports) can be referenced
//! by name from any later call. Two back-to-back `sync: false` calls have no
//! ordering guarantee between them.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{config::Config, error::EvalError};

pub mod snippets;

/// Variable bindings for the free identifiers of a code snippet.
pub type Vars = Map<String, Value>;

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRequest {
    pub code: String,
    pub vars: Vars,
    pub sync: bool,
    pub content_type: &'static str,
}

impl EvaluationRequest {
    pub fn new(code: impl Into<String>, vars: Vars, sync: bool) -> Self {
        Self { code: code.into(), vars, sync, content_type: JSON_CONTENT_TYPE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default)]
    pub value: Value,
    pub errored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationResult {
    pub fn ok(value: Value) -> Self {
        Self { value, errored: false, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { value: Value::Null, errored: true, error: Some(error.into()) }
    }

    /// Restore `errored == error.is_some()` on a decoded result.
    fn normalized(mut self) -> Self {
        if self.errored {
            self.error.get_or_insert_with(String::new);
        } else {
            self.error = None;
        }
        self
    }

    /// The value, or the remote error with the diagnostic prefix.
    pub fn into_value(self) -> Result<Value, EvalError> {
        if self.errored {
            return Err(EvalError::RemoteEvaluation(self.error.unwrap_or_default()));
        }
        Ok(self.value)
    }
}

#[derive(Debug, Clone)]
pub struct EvalClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EvalClient {
    pub fn from_config(cfg: &Config) -> Result<Self, EvalError> {
        Self::new(cfg.evaluate_url(), Duration::from_secs(cfg.request_timeout()))
    }

    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, EvalError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, endpoint: endpoint.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run `code` remotely. A remote exception is reported inside the result;
    /// only transport failures and undecodable bodies are returned as errors.
    pub async fn evaluate(&self, code: &str, vars: Vars, sync: bool) -> Result<EvaluationResult, EvalError> {
        let request = EvaluationRequest::new(code, vars, sync);
        debug!(endpoint = %self.endpoint, sync, code_len = code.len(), "webeval request");

        let resp = self.http.post(&self.endpoint).json(&request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EvalError::Transport(format!("{} - {}", status, text)));
        }

        let body = resp.text().await?;
        let result = serde_json::from_str::<EvaluationResult>(&body)
            .map_err(|e| EvalError::MalformedResponse(e.to_string()))?
            .normalized();

        if let Some(err) = &result.error {
            debug!(error = %err, "webeval remote error");
        }
        Ok(result)
    }

    /// Like [`evaluate`](Self::evaluate) but turns a remote exception into
    /// [`EvalError::RemoteEvaluation`].
    pub async fn exeval(&self, code: &str, vars: Vars, sync: bool) -> Result<Value, EvalError> {
        let result = self.evaluate(code, vars, sync).await?;
        if result.errored {
            warn!(error = ?result.error, "remote evaluation errored");
        }
        result.into_value()
    }

    /// Evaluate `code` expecting a list of strings.
    ///
    /// Any failure degrades to an empty list so a broken query never blocks the
    /// caller; the cause is logged.
    pub async fn exeval_list(&self, code: &str, vars: Vars, sync: bool) -> Vec<String> {
        match self.exeval(code, vars, sync).await {
            Ok(value) => coerce_string_list(value),
            Err(e) => {
                warn!(error = %e, "list query failed; treating as empty");
                Vec::new()
            }
        }
    }
}

/// Coerce a response value to a list of strings. Non-arrays become empty,
/// non-string items are dropped.
pub fn coerce_string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => {
            let total = items.len();
            let list: Vec<String> = items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            if list.len() != total {
                warn!(dropped = total - list.len(), "non-string entries in list response");
            }
            list
        }
        other => {
            warn!(kind = value_kind(&other), "expected an array response; treating as empty");
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build a [`Vars`] map from `(name, value)` pairs.
pub fn vars<I, K>(pairs: I) -> Vars
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
