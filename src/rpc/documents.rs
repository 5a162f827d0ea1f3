//! Operation documents for the perspective surface.
//!
//! Every operation selecting a handle or a link expression uses the same
//! selection set, so pushes and round-trips decode into the same types.

use super::envelope::{OperationKind, RpcRequest};
use crate::error::ClientError;
use crate::links::{Link, LinkExpressionInput, LinkQuery};
use serde_json::json;

pub const PERSPECTIVES: &str = "perspectives";
pub const PERSPECTIVE: &str = "perspective";
pub const PERSPECTIVE_SNAPSHOT: &str = "perspectiveSnapshot";
pub const PERSPECTIVE_QUERY_LINKS: &str = "perspectiveQueryLinks";
pub const PERSPECTIVE_ADD: &str = "perspectiveAdd";
pub const PERSPECTIVE_UPDATE: &str = "perspectiveUpdate";
pub const PERSPECTIVE_REMOVE: &str = "perspectiveRemove";
pub const PERSPECTIVE_ADD_LINK: &str = "perspectiveAddLink";
pub const PERSPECTIVE_UPDATE_LINK: &str = "perspectiveUpdateLink";
pub const PERSPECTIVE_REMOVE_LINK: &str = "perspectiveRemoveLink";
pub const PERSPECTIVE_ADDED: &str = "perspectiveAdded";
pub const PERSPECTIVE_UPDATED: &str = "perspectiveUpdated";
pub const PERSPECTIVE_REMOVED: &str = "perspectiveRemoved";
pub const PERSPECTIVE_LINK_ADDED: &str = "perspectiveLinkAdded";
pub const PERSPECTIVE_LINK_REMOVED: &str = "perspectiveLinkRemoved";

pub const LINK_EXPRESSION_FIELDS: &str = r#"
author
timestamp
data { source, predicate, target }
proof { valid, invalid, signature, key }
"#;

fn perspective_handle_fields() -> String {
    format!(
        r#"
uuid
name
sharedUrl
neighbourhood {{
    linkLanguage
    meta {{ links {{ {LINK_EXPRESSION_FIELDS} }} }}
}}
"#
    )
}

pub fn perspectives() -> RpcRequest {
    RpcRequest::new(
        OperationKind::Query,
        PERSPECTIVES,
        format!(
            "query perspectives {{ perspectives {{ {} }} }}",
            perspective_handle_fields()
        ),
        json!({}),
    )
}

pub fn perspective(uuid: &str) -> RpcRequest {
    RpcRequest::new(
        OperationKind::Query,
        PERSPECTIVE,
        format!(
            "query perspective($uuid: String!) {{ perspective(uuid: $uuid) {{ {} }} }}",
            perspective_handle_fields()
        ),
        json!({ "uuid": uuid }),
    )
}

pub fn perspective_snapshot(uuid: &str) -> RpcRequest {
    RpcRequest::new(
        OperationKind::Query,
        PERSPECTIVE_SNAPSHOT,
        format!(
            "query perspectiveSnapshot($uuid: String!) {{ perspectiveSnapshot(uuid: $uuid) {{ links {{ {LINK_EXPRESSION_FIELDS} }} }} }}"
        ),
        json!({ "uuid": uuid }),
    )
}

pub fn perspective_query_links(uuid: &str, query: &LinkQuery) -> Result<RpcRequest, ClientError> {
    Ok(RpcRequest::new(
        OperationKind::Query,
        PERSPECTIVE_QUERY_LINKS,
        format!(
            "query perspectiveQueryLinks($uuid: String!, $query: LinkQuery!) {{ perspectiveQueryLinks(query: $query, uuid: $uuid) {{ {LINK_EXPRESSION_FIELDS} }} }}"
        ),
        json!({ "uuid": uuid, "query": serde_json::to_value(query)? }),
    ))
}

pub fn perspective_add(name: &str) -> RpcRequest {
    RpcRequest::new(
        OperationKind::Mutation,
        PERSPECTIVE_ADD,
        format!(
            "mutation perspectiveAdd($name: String!) {{ perspectiveAdd(name: $name) {{ {} }} }}",
            perspective_handle_fields()
        ),
        json!({ "name": name }),
    )
}

pub fn perspective_update(uuid: &str, name: &str) -> RpcRequest {
    RpcRequest::new(
        OperationKind::Mutation,
        PERSPECTIVE_UPDATE,
        format!(
            "mutation perspectiveUpdate($uuid: String!, $name: String!) {{ perspectiveUpdate(uuid: $uuid, name: $name) {{ {} }} }}",
            perspective_handle_fields()
        ),
        json!({ "uuid": uuid, "name": name }),
    )
}

pub fn perspective_remove(uuid: &str) -> RpcRequest {
    RpcRequest::new(
        OperationKind::Mutation,
        PERSPECTIVE_REMOVE,
        "mutation perspectiveRemove($uuid: String!) { perspectiveRemove(uuid: $uuid) }",
        json!({ "uuid": uuid }),
    )
}

pub fn perspective_add_link(uuid: &str, link: &Link) -> Result<RpcRequest, ClientError> {
    Ok(RpcRequest::new(
        OperationKind::Mutation,
        PERSPECTIVE_ADD_LINK,
        format!(
            "mutation perspectiveAddLink($uuid: String!, $link: LinkInput!) {{ perspectiveAddLink(link: $link, uuid: $uuid) {{ {LINK_EXPRESSION_FIELDS} }} }}"
        ),
        json!({ "uuid": uuid, "link": serde_json::to_value(link)? }),
    ))
}

pub fn perspective_update_link(
    uuid: &str,
    old_link: &LinkExpressionInput,
    new_link: &Link,
) -> Result<RpcRequest, ClientError> {
    Ok(RpcRequest::new(
        OperationKind::Mutation,
        PERSPECTIVE_UPDATE_LINK,
        format!(
            "mutation perspectiveUpdateLink($uuid: String!, $newLink: LinkInput!, $oldLink: LinkExpressionInput!) {{ perspectiveUpdateLink(newLink: $newLink, oldLink: $oldLink, uuid: $uuid) {{ {LINK_EXPRESSION_FIELDS} }} }}"
        ),
        json!({
            "uuid": uuid,
            "oldLink": serde_json::to_value(old_link)?,
            "newLink": serde_json::to_value(new_link)?,
        }),
    ))
}

pub fn perspective_remove_link(
    uuid: &str,
    link: &LinkExpressionInput,
) -> Result<RpcRequest, ClientError> {
    Ok(RpcRequest::new(
        OperationKind::Mutation,
        PERSPECTIVE_REMOVE_LINK,
        "mutation perspectiveRemoveLink($link: LinkExpressionInput!, $uuid: String!) { perspectiveRemoveLink(link: $link, uuid: $uuid) }",
        json!({ "uuid": uuid, "link": serde_json::to_value(link)? }),
    ))
}

pub fn perspective_added() -> RpcRequest {
    RpcRequest::new(
        OperationKind::Subscription,
        PERSPECTIVE_ADDED,
        format!(
            "subscription {{ perspectiveAdded {{ {} }} }}",
            perspective_handle_fields()
        ),
        json!({}),
    )
}

pub fn perspective_updated() -> RpcRequest {
    RpcRequest::new(
        OperationKind::Subscription,
        PERSPECTIVE_UPDATED,
        format!(
            "subscription {{ perspectiveUpdated {{ {} }} }}",
            perspective_handle_fields()
        ),
        json!({}),
    )
}

pub fn perspective_removed() -> RpcRequest {
    RpcRequest::new(
        OperationKind::Subscription,
        PERSPECTIVE_REMOVED,
        "subscription { perspectiveRemoved }",
        json!({}),
    )
}

pub fn perspective_link_added(uuid: &str) -> RpcRequest {
    RpcRequest::new(
        OperationKind::Subscription,
        PERSPECTIVE_LINK_ADDED,
        format!(
            "subscription perspectiveLinkAdded($uuid: String!) {{ perspectiveLinkAdded(uuid: $uuid) {{ {LINK_EXPRESSION_FIELDS} }} }}"
        ),
        json!({ "uuid": uuid }),
    )
}

pub fn perspective_link_removed(uuid: &str) -> RpcRequest {
    RpcRequest::new(
        OperationKind::Subscription,
        PERSPECTIVE_LINK_REMOVED,
        format!(
            "subscription perspectiveLinkRemoved($uuid: String!) {{ perspectiveLinkRemoved(uuid: $uuid) {{ {LINK_EXPRESSION_FIELDS} }} }}"
        ),
        json!({ "uuid": uuid }),
    )
}
