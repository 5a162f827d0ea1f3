//! Link and LinkExpression value types.

use crate::types::{Address, Did};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directed edge between two resource addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    pub target: Address,
}

impl Link {
    /// Create an unlabeled link.
    pub fn new(source: impl Into<Address>, target: impl Into<Address>) -> Self {
        Self {
            source: source.into(),
            predicate: None,
            target: target.into(),
        }
    }

    /// Set the relation label.
    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

/// Authorship attestation over a link's canonical encoding.
///
/// `valid` and `invalid` are set by the store once it has checked the
/// signature; both are absent before that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proof {
    pub signature: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid: Option<bool>,
}

impl Proof {
    pub fn new(signature: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            key: key.into(),
            valid: None,
            invalid: None,
        }
    }

    /// Whether the store has checked this proof.
    pub fn is_checked(&self) -> bool {
        self.valid.is_some() || self.invalid.is_some()
    }
}

/// A link plus author, timestamp and proof.
///
/// There is no server-assigned id: updating or removing a link requires the
/// expression previously read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkExpression {
    pub author: Did,
    pub timestamp: String,
    pub data: Link,
    pub proof: Proof,
}

impl LinkExpression {
    /// Identity projection sent to the store for update/remove.
    pub fn to_input(&self) -> LinkExpressionInput {
        LinkExpressionInput::from(self)
    }

    /// Whether `input` identifies this expression.
    ///
    /// Identity is `(author, timestamp, data, proof.signature, proof.key)`;
    /// the store-set validity flags are ignored.
    pub fn is_same_expression(&self, input: &LinkExpressionInput) -> bool {
        self.author == input.author
            && self.timestamp == input.timestamp
            && self.data == input.data
            && self.proof.signature == input.proof.signature
            && self.proof.key == input.proof.key
    }

    /// Timestamp parsed as RFC 3339, if well-formed.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// Proof fields that take part in expression identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofInput {
    pub signature: String,
    pub key: String,
}

/// Wire shape identifying an existing expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkExpressionInput {
    pub author: Did,
    pub timestamp: String,
    pub data: Link,
    pub proof: ProofInput,
}

impl From<&LinkExpression> for LinkExpressionInput {
    fn from(expr: &LinkExpression) -> Self {
        Self {
            author: expr.author.clone(),
            timestamp: expr.timestamp.clone(),
            data: expr.data.clone(),
            proof: ProofInput {
                signature: expr.proof.signature.clone(),
                key: expr.proof.key.clone(),
            },
        }
    }
}
