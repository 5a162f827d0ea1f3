use super::support::{assert_quiet, connect, fast_config, recv};
use async_trait::async_trait;
use perspective_client::rpc::{documents, PushStream, RpcRequest, RpcResponse};
use perspective_client::{
    ClientError, Link, LinkEventKind, MemoryTransport, PerspectiveClient, RpcTransport,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::test]
async fn added_listener_fires_once_per_add() {
    let (_store, client) = connect().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.add_perspective_added_listener(move |handle| {
        let _ = tx.send(handle.name.clone());
    });

    let created = client.add("x").await.unwrap();
    assert_eq!(recv(&mut rx).await, "x");
    assert_quiet(&mut rx).await;
    assert_eq!(created.name(), "x");
}

#[tokio::test]
async fn updated_and_removed_listeners_fire() {
    let (_store, client) = connect().await;
    let (updated_tx, mut updated_rx) = mpsc::unbounded_channel();
    let (removed_tx, mut removed_rx) = mpsc::unbounded_channel();
    client.add_perspective_updated_listener(move |handle| {
        let _ = updated_tx.send((handle.uuid.clone(), handle.name.clone()));
    });
    client.add_perspective_removed_listener(move |uuid| {
        let _ = removed_tx.send(uuid.to_string());
    });

    let p = client.add("before").await.unwrap();
    client.update(p.uuid(), "after").await.unwrap();
    assert_eq!(
        recv(&mut updated_rx).await,
        (p.uuid().to_string(), "after".to_string())
    );

    client.remove(p.uuid()).await.unwrap();
    assert_eq!(recv(&mut removed_rx).await, p.uuid());

    // Nothing was removed, so nothing is pushed.
    client.remove(p.uuid()).await.unwrap();
    assert_quiet(&mut removed_rx).await;
}

#[tokio::test]
async fn listeners_run_in_registration_order() {
    let (_store, client) = connect().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    for i in 0..3 {
        let tx = tx.clone();
        client.add_perspective_added_listener(move |_| {
            let _ = tx.send(i);
        });
    }

    client.add("ordered").await.unwrap();
    assert_eq!(recv(&mut rx).await, 0);
    assert_eq!(recv(&mut rx).await, 1);
    assert_eq!(recv(&mut rx).await, 2);
}

#[tokio::test]
async fn panicking_listener_does_not_block_the_rest() {
    let (_store, client) = connect().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.add_perspective_added_listener(|_| panic!("listener failure"));
    client.add_perspective_added_listener(move |handle| {
        let _ = tx.send(handle.name.clone());
    });

    client.add("first").await.unwrap();
    client.add("second").await.unwrap();
    assert_eq!(recv(&mut rx).await, "first");
    assert_eq!(recv(&mut rx).await, "second");
}

#[tokio::test]
async fn removed_listener_stops_receiving() {
    let (_store, client) = connect().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let token = client.add_perspective_added_listener(move |handle| {
        let _ = tx.send(handle.name.clone());
    });

    client.add("seen").await.unwrap();
    assert_eq!(recv(&mut rx).await, "seen");

    assert!(client.remove_perspective_added_listener(token));
    assert!(!client.remove_perspective_added_listener(token));
    // A token from one registry does not remove from another.
    assert!(!client.remove_perspective_updated_listener(token));

    client.add("unseen").await.unwrap();
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn push_errors_are_logged_and_skipped() {
    let (store, client) = connect().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.add_perspective_added_listener(move |handle| {
        let _ = tx.send(handle.name.clone());
    });

    store.inject_push_error("connection hiccup");
    client.add("after-error").await.unwrap();
    assert_eq!(recv(&mut rx).await, "after-error");
}

#[tokio::test]
async fn link_subscription_is_active_on_return() {
    let (_store, client) = connect().await;
    let p = client.add("graph").await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let subscription = client
        .add_perspective_link_added_listener(p.uuid(), move |expr| {
            let _ = tx.send(expr.clone());
        })
        .await
        .unwrap();
    assert!(subscription.is_active());
    assert_eq!(subscription.uuid(), p.uuid());
    assert_eq!(subscription.kind(), LinkEventKind::Added);

    // No settling delay: a link added right away is delivered.
    let expr = client
        .add_link(p.uuid(), Link::new("root", "a"))
        .await
        .unwrap();
    assert_eq!(recv(&mut rx).await, expr);

    subscription.cancel();
    subscription.closed().await;
    assert!(!subscription.is_active());

    client
        .add_link(p.uuid(), Link::new("root", "b"))
        .await
        .unwrap();
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn link_subscriptions_are_scoped_to_one_perspective() {
    let (_store, client) = connect().await;
    let watched = client.add("watched").await.unwrap();
    let other = client.add("other").await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _subscription = client
        .add_perspective_link_removed_listener(watched.uuid(), move |expr| {
            let _ = tx.send(expr.data.target.clone());
        })
        .await
        .unwrap();

    let elsewhere = client
        .add_link(other.uuid(), Link::new("root", "elsewhere"))
        .await
        .unwrap();
    client.remove_link(other.uuid(), &elsewhere).await.unwrap();
    assert_quiet(&mut rx).await;

    let here = client
        .add_link(watched.uuid(), Link::new("root", "here"))
        .await
        .unwrap();
    client.remove_link(watched.uuid(), &here).await.unwrap();
    assert_eq!(recv(&mut rx).await, "here");
}

#[tokio::test]
async fn update_link_pushes_removed_then_added() {
    let (_store, client) = connect().await;
    let p = client.add("graph").await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let removed_tx = tx.clone();

    let _added = client
        .add_perspective_link_added_listener(p.uuid(), move |expr| {
            let _ = tx.send(("added", expr.data.target.clone()));
        })
        .await
        .unwrap();
    let _removed = client
        .add_perspective_link_removed_listener(p.uuid(), move |expr| {
            let _ = removed_tx.send(("removed", expr.data.target.clone()));
        })
        .await
        .unwrap();

    let old = client
        .add_link(p.uuid(), Link::new("root", "old"))
        .await
        .unwrap();
    assert_eq!(recv(&mut rx).await, ("added", "old".to_string()));

    client
        .update_link(p.uuid(), &old, Link::new("root", "new"))
        .await
        .unwrap();
    let mut events = vec![recv(&mut rx).await, recv(&mut rx).await];
    events.sort();
    assert_eq!(
        events,
        vec![("added", "new".to_string()), ("removed", "old".to_string())]
    );
}

/// Store whose perspective-added stream ends immediately the first time it is
/// opened, then behaves normally.
struct FlakyAddedStream {
    inner: MemoryTransport,
    added_opens: AtomicUsize,
}

#[async_trait]
impl RpcTransport for FlakyAddedStream {
    async fn execute(&self, request: RpcRequest) -> Result<RpcResponse, ClientError> {
        self.inner.execute(request).await
    }

    async fn subscribe(&self, request: RpcRequest) -> Result<PushStream, ClientError> {
        if request.operation_name == documents::PERSPECTIVE_ADDED
            && self.added_opens.fetch_add(1, Ordering::SeqCst) == 0
        {
            return Ok(Box::pin(futures::stream::empty::<
                Result<RpcResponse, ClientError>,
            >()));
        }
        self.inner.subscribe(request).await
    }
}

#[tokio::test]
async fn ended_stream_is_reopened() {
    let store = Arc::new(FlakyAddedStream {
        inner: MemoryTransport::new(),
        added_opens: AtomicUsize::new(0),
    });
    let client = PerspectiveClient::connect_with_config(store.clone(), fast_config())
        .await
        .unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.add_perspective_added_listener(move |handle| {
        let _ = tx.send(handle.name.clone());
    });

    // Wait for the pump to re-open before pushing.
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while store.added_opens.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    client.add("after-reopen").await.unwrap();
    assert_eq!(recv(&mut rx).await, "after-reopen");
}

#[tokio::test]
async fn ended_stream_without_resubscribe_stops() {
    let store = Arc::new(FlakyAddedStream {
        inner: MemoryTransport::new(),
        added_opens: AtomicUsize::new(0),
    });
    let mut config = fast_config();
    config.subscriptions.resubscribe = false;
    let client = PerspectiveClient::connect_with_config(store.clone(), config)
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(store.added_opens.load(Ordering::SeqCst), 1);
    drop(client);
}

#[tokio::test]
async fn link_subscriptions_stop_with_the_last_client() {
    let (store, client) = connect().await;
    let p = client.add("graph").await.unwrap();
    let uuid = p.uuid().to_string();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let subscription = p
        .add_link_added_listener(move |expr| {
            let _ = tx.send(expr.data.target.clone());
        })
        .await
        .unwrap();
    let clone = client.clone();
    drop(client);
    drop(p);
    assert!(subscription.is_active());

    drop(clone);
    subscription.closed().await;
    assert!(!subscription.is_active());

    // Write straight to the store: nobody holds a client any more.
    let response = store
        .execute(documents::perspective_add_link(&uuid, &Link::new("root", "late")).unwrap())
        .await
        .unwrap();
    assert!(response.errors.is_empty());
    assert_quiet(&mut rx).await;
}
