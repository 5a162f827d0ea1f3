//! Request and response envelopes.

use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a named operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// A named operation ready to be sent over a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub kind: OperationKind,
    pub operation_name: String,
    /// Operation document including the field selection.
    pub document: String,
    pub variables: Value,
}

impl RpcRequest {
    pub fn new(
        kind: OperationKind,
        operation_name: impl Into<String>,
        document: impl Into<String>,
        variables: Value,
    ) -> Self {
        Self {
            kind,
            operation_name: operation_name.into(),
            document: document.into(),
            variables,
        }
    }

    /// Decode one variable, if present and well-formed.
    pub fn variable<T: DeserializeOwned>(&self, name: &str) -> Result<T, ClientError> {
        let value = self.variables.get(name).cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

/// One error reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteErrorEntry {
    pub message: String,
}

/// Response envelope: a data payload or a list of errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<RemoteErrorEntry>,
}

impl RpcResponse {
    /// Successful response carrying `value` under `field`.
    pub fn field(field: &str, value: Value) -> Self {
        let mut data = serde_json::Map::new();
        data.insert(field.to_string(), value);
        Self {
            data: Some(Value::Object(data)),
            errors: Vec::new(),
        }
    }

    /// Failed response with a single message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: vec![RemoteErrorEntry {
                message: message.into(),
            }],
        }
    }
}

/// Unwrap a response into its data payload.
///
/// Every query, mutation and push goes through here; callers never see the
/// raw envelope.
pub fn unwrap_response(response: RpcResponse) -> Result<Value, ClientError> {
    if !response.errors.is_empty() {
        return Err(ClientError::remote(
            response.errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    response
        .data
        .ok_or_else(|| ClientError::remote(vec!["Empty response".to_string()]))
}

/// Take `field` out of an unwrapped payload and decode it.
///
/// A missing field decodes from `null`, so `Option` targets yield `None`.
pub fn take_field<T: DeserializeOwned>(mut data: Value, field: &str) -> Result<T, ClientError> {
    let value = data
        .get_mut(field)
        .map(Value::take)
        .unwrap_or(Value::Null);
    Ok(serde_json::from_value(value)?)
}
