use super::support::connect;
use chrono::{DateTime, Utc};
use perspective_client::{ClientError, Link, LinkQuery};

#[tokio::test]
async fn add_then_list_and_lookup() {
    let (_store, client) = connect().await;

    let created = client.add("notes").await.unwrap();
    assert_eq!(created.name(), "notes");
    assert!(!created.uuid().is_empty());
    assert!(created.shared_url().is_none());

    let all = client.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].uuid(), created.uuid());

    let found = client.by_uuid(created.uuid()).await.unwrap().unwrap();
    assert_eq!(found.handle(), created.handle());
}

#[tokio::test]
async fn names_need_not_be_unique() {
    let (_store, client) = connect().await;
    let a = client.add("same").await.unwrap();
    let b = client.add("same").await.unwrap();
    assert_ne!(a.uuid(), b.uuid());
    assert_eq!(client.all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_uuid_is_not_an_error_for_reads() {
    let (_store, client) = connect().await;
    assert!(client.by_uuid("missing").await.unwrap().is_none());
    assert!(client.snapshot_by_uuid("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn update_renames_and_rejects_unknown_uuid() {
    let (_store, client) = connect().await;
    let created = client.add("draft").await.unwrap();

    let renamed = client.update(created.uuid(), "final").await.unwrap();
    assert_eq!(renamed.uuid(), created.uuid());
    assert_eq!(renamed.name(), "final");
    let fetched = client.by_uuid(created.uuid()).await.unwrap().unwrap();
    assert_eq!(fetched.name(), "final");

    let err = client.update("missing", "x").await.unwrap_err();
    assert!(matches!(err, ClientError::RemoteError { .. }));
    assert_eq!(
        err.first_remote_message(),
        Some("Perspective not found: missing")
    );
}

#[tokio::test]
async fn remove_reports_whether_anything_was_removed() {
    let (_store, client) = connect().await;
    let created = client.add("temp").await.unwrap();

    assert!(client.remove(created.uuid()).await.unwrap());
    assert!(!client.remove(created.uuid()).await.unwrap());
    assert!(client.by_uuid(created.uuid()).await.unwrap().is_none());
    assert!(client.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn add_link_is_stamped_by_the_store() {
    let (store, client) = connect().await;
    let p = client.add("graph").await.unwrap();

    let link = Link::new("root", "child").with_predicate("has");
    let expr = client.add_link(p.uuid(), link.clone()).await.unwrap();
    assert_eq!(expr.data, link);
    assert_eq!(expr.author, store.agent());
    assert!(expr.parsed_timestamp().is_some());
    assert!(!expr.proof.signature.is_empty());

    let snapshot = client.snapshot_by_uuid(p.uuid()).await.unwrap().unwrap();
    assert_eq!(snapshot.links, vec![expr]);
}

#[tokio::test]
async fn add_then_query_by_source_returns_the_link() {
    let (_store, client) = connect().await;
    let p = client.add("graph").await.unwrap();
    client
        .add_link(p.uuid(), Link::new("other", "x"))
        .await
        .unwrap();
    let expr = client
        .add_link(p.uuid(), Link::new("root", "a").with_predicate("p"))
        .await
        .unwrap();

    let found = client
        .query_links(p.uuid(), &LinkQuery::all().source("root"))
        .await
        .unwrap();
    assert_eq!(found, vec![expr]);
}

#[tokio::test]
async fn wildcard_query_equals_snapshot() {
    let (_store, client) = connect().await;
    let p = client.add("graph").await.unwrap();
    for target in ["a", "b", "c"] {
        client
            .add_link(p.uuid(), Link::new("root", target))
            .await
            .unwrap();
    }

    let queried = client.query_links(p.uuid(), &LinkQuery::all()).await.unwrap();
    let snapshot = client.snapshot_by_uuid(p.uuid()).await.unwrap().unwrap();
    assert_eq!(queried, snapshot.links);
    assert_eq!(queried.len(), 3);
}

#[tokio::test]
async fn empty_perspective_queries_return_empty() {
    let (_store, client) = connect().await;
    let p = client.add("empty").await.unwrap();
    assert!(client
        .query_links(p.uuid(), &LinkQuery::all())
        .await
        .unwrap()
        .is_empty());
    assert!(client
        .snapshot_by_uuid(p.uuid())
        .await
        .unwrap()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn query_on_unknown_perspective_is_a_remote_error() {
    let (_store, client) = connect().await;
    let err = client
        .query_links("missing", &LinkQuery::all())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RemoteError { .. }));
}

#[tokio::test]
async fn update_link_replaces_exactly_the_old_expression() {
    let (_store, client) = connect().await;
    let p = client.add("graph").await.unwrap();
    let old = client
        .add_link(p.uuid(), Link::new("root", "a").with_predicate("p"))
        .await
        .unwrap();
    let keep = client
        .add_link(p.uuid(), Link::new("root", "b"))
        .await
        .unwrap();

    let new = client
        .update_link(p.uuid(), &old, Link::new("root", "z").with_predicate("p"))
        .await
        .unwrap();
    assert_eq!(new.data.target, "z");

    let links = client.snapshot_by_uuid(p.uuid()).await.unwrap().unwrap().links;
    assert_eq!(links, vec![new, keep]);

    // The old expression is gone, so a second update has nothing to replace.
    let err = client
        .update_link(p.uuid(), &old, Link::new("root", "y"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RemoteError { .. }));
}

#[tokio::test]
async fn failed_remove_link_is_idempotent() {
    let (_store, client) = connect().await;
    let p = client.add("graph").await.unwrap();
    let expr = client
        .add_link(p.uuid(), Link::new("root", "a"))
        .await
        .unwrap();

    assert!(client.remove_link(p.uuid(), &expr).await.unwrap());
    let after_first = client.snapshot_by_uuid(p.uuid()).await.unwrap().unwrap();

    assert!(!client.remove_link(p.uuid(), &expr).await.unwrap());
    let after_second = client.snapshot_by_uuid(p.uuid()).await.unwrap().unwrap();
    assert_eq!(after_first, after_second);
    assert!(after_second.is_empty());
}

#[tokio::test]
async fn remove_link_ignores_proof_validity_flags() {
    let (_store, client) = connect().await;
    let p = client.add("graph").await.unwrap();
    let mut expr = client
        .add_link(p.uuid(), Link::new("root", "a"))
        .await
        .unwrap();

    expr.proof.valid = None;
    expr.proof.invalid = Some(false);
    assert!(client.remove_link(p.uuid(), &expr).await.unwrap());
}

fn ts(expr: &perspective_client::LinkExpression) -> DateTime<Utc> {
    expr.parsed_timestamp().unwrap()
}

#[tokio::test]
async fn date_window_is_half_open() {
    let (_store, client) = connect().await;
    let p = client.add("timeline").await.unwrap();
    let mut exprs = Vec::new();
    for target in ["a", "b", "c"] {
        exprs.push(
            client
                .add_link(p.uuid(), Link::new("root", target))
                .await
                .unwrap(),
        );
    }

    let from_second = client
        .query_links(p.uuid(), &LinkQuery::all().from_date(ts(&exprs[1])))
        .await
        .unwrap();
    assert_eq!(from_second, exprs[1..].to_vec());

    let until_second = client
        .query_links(p.uuid(), &LinkQuery::all().until_date(ts(&exprs[1])))
        .await
        .unwrap();
    assert_eq!(until_second, exprs[..1].to_vec());

    let limited = client
        .query_links(p.uuid(), &LinkQuery::all().source("root").limit(2))
        .await
        .unwrap();
    assert_eq!(limited, exprs[..2].to_vec());
}

fn seeded(target: &str, timestamp: &str) -> perspective_client::LinkExpression {
    perspective_client::LinkExpression {
        author: "did:key:remote-agent".to_string(),
        timestamp: timestamp.to_string(),
        data: Link::new("root", target).with_predicate("p"),
        proof: perspective_client::links::Proof::new("sig", "did:key:remote-agent#primary"),
    }
}

#[tokio::test]
async fn seeded_perspective_is_queryable() {
    let (store, client) = connect().await;
    let early = seeded("early", "2024-01-01T00:00:00Z");
    let broken = seeded("broken", "not a timestamp");
    let late = seeded("late", "2024-06-01T00:00:00Z");
    store.insert_perspective(
        perspective_client::PerspectiveHandle::new("seeded-uuid", "imported"),
        vec![early.clone(), broken.clone(), late.clone()],
    );

    let p = client.by_uuid("seeded-uuid").await.unwrap().unwrap();
    assert_eq!(p.name(), "imported");
    assert_eq!(
        client
            .query_links("seeded-uuid", &LinkQuery::all().predicate("p"))
            .await
            .unwrap(),
        vec![early.clone(), broken.clone(), late.clone()]
    );

    let cutoff: DateTime<Utc> = "2024-03-01T00:00:00Z".parse().unwrap();
    let after = client
        .query_links("seeded-uuid", &LinkQuery::all().from_date(cutoff))
        .await
        .unwrap();
    assert_eq!(after, vec![late]);

    // Seeded links carry the seeder's authorship and can be removed by identity.
    assert!(client.remove_link("seeded-uuid", &broken).await.unwrap());
    let remaining = client.snapshot_by_uuid("seeded-uuid").await.unwrap().unwrap();
    assert_eq!(remaining.links.len(), 2);
    assert_eq!(remaining.links[0], early);
}

#[tokio::test]
async fn reseeding_replaces_the_perspective() {
    let (store, client) = connect().await;
    let handle = perspective_client::PerspectiveHandle::new("seeded-uuid", "first");
    store.insert_perspective(handle, vec![seeded("a", "2024-01-01T00:00:00Z")]);
    store.insert_perspective(
        perspective_client::PerspectiveHandle::new("seeded-uuid", "second"),
        Vec::new(),
    );

    let all = client.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name(), "second");
    assert!(client
        .snapshot_by_uuid("seeded-uuid")
        .await
        .unwrap()
        .unwrap()
        .is_empty());
}
