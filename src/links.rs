//! Link data model
//!
//! Directed, optionally labeled edges between resource addresses, the
//! authorship envelope the store attaches to each of them, and the filter
//! contract used to read them back.

pub mod expression;
pub mod query;

pub use expression::{Link, LinkExpression, LinkExpressionInput, Proof, ProofInput};
pub use query::LinkQuery;
