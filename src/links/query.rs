//! LinkQuery: partial-match filter over link expressions.
//!
//! An unset field is a wildcard. A set field must match exactly
//! (case-sensitive string equality). Date bounds form a half-open window
//! over the expression timestamp: `from_date` inclusive, `until_date`
//! exclusive. `limit` is applied after filtering.

use super::expression::LinkExpression;
use crate::types::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter specification for link retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl LinkQuery {
    /// A query with every field unset.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl Into<Address>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn target(mut self, target: impl Into<Address>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn from_date(mut self, from: DateTime<Utc>) -> Self {
        self.from_date = Some(from);
        self
    }

    pub fn until_date(mut self, until: DateTime<Utc>) -> Self {
        self.until_date = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether every field is unset.
    pub fn is_wildcard(&self) -> bool {
        *self == Self::default()
    }

    /// Whether a single expression passes the field and date filters.
    /// `limit` plays no part here.
    pub fn matches(&self, expr: &LinkExpression) -> bool {
        if let Some(source) = &self.source {
            if &expr.data.source != source {
                return false;
            }
        }
        if let Some(predicate) = &self.predicate {
            if expr.data.predicate.as_ref() != Some(predicate) {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if &expr.data.target != target {
                return false;
            }
        }
        if self.from_date.is_none() && self.until_date.is_none() {
            return true;
        }

        // Unparseable timestamps never satisfy a date bound.
        let Some(ts) = expr.parsed_timestamp() else {
            return false;
        };
        if let Some(from) = self.from_date {
            if ts < from {
                return false;
            }
        }
        if let Some(until) = self.until_date {
            if ts >= until {
                return false;
            }
        }
        true
    }

    /// Filter `links` in order, then truncate to `limit`.
    pub fn apply<'a, I>(&self, links: I) -> Vec<LinkExpression>
    where
        I: IntoIterator<Item = &'a LinkExpression>,
    {
        let filtered = links.into_iter().filter(|expr| self.matches(expr)).cloned();
        match self.limit {
            Some(limit) => filtered.take(limit).collect(),
            None => filtered.collect(),
        }
    }
}
