//! End-to-end flow: cached reads expiring under TTL, writes dispatching
//! invalidation rules, and bindings reconciling live deliveries with the
//! store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use corrente::{
    CacheConfig, CacheService, CacheStore, CachedQuery, InvalidateFn, InvalidationRegistry,
    LiveQuerySource, QueryKey, compose,
};
use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use serde_json::{Value, json};

/// Surface cache-layer logs under `RUST_LOG` while tests run.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn spy(counter: Arc<AtomicUsize>) -> InvalidateFn {
    Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

struct ChannelSource {
    rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<Option<Value>>>>,
}

impl ChannelSource {
    fn new() -> (mpsc::UnboundedSender<Option<Value>>, Self) {
        let (tx, rx) = mpsc::unbounded();
        (
            tx,
            Self {
                rx: std::sync::Mutex::new(Some(rx)),
            },
        )
    }
}

impl LiveQuerySource for ChannelSource {
    fn subscribe(&self, _query: &str, _args: &Value) -> BoxStream<'static, Option<Value>> {
        self.rx
            .lock()
            .expect("test source lock")
            .take()
            .expect("single subscription per test source")
            .boxed()
    }
}

#[tokio::test]
async fn entry_expires_after_ttl() {
    init_tracing();
    let store = CacheStore::new();
    let key = QueryKey::new("projects.list", &json!({})).expect("key");
    assert_eq!(key.as_str(), "q:projects.list:{}");

    store.set(&key, json!([{"id": "P1"}]), Duration::from_millis(100));
    assert_eq!(store.get(&key), Some(json!([{"id": "P1"}])));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(store.get(&key).is_none());
}

#[test]
fn composite_rule_fires_each_action_once() {
    init_tracing();
    let store = CacheStore::new();
    let invalidate_projects = Arc::new(AtomicUsize::new(0));
    let invalidate_analytics = Arc::new(AtomicUsize::new(0));
    let invalidate_contacts = Arc::new(AtomicUsize::new(0));

    let registry = InvalidationRegistry::new()
        .rule(
            "projects",
            compose(vec![
                spy(Arc::clone(&invalidate_projects)),
                spy(Arc::clone(&invalidate_analytics)),
            ]),
        )
        .rule("contacts", spy(Arc::clone(&invalidate_contacts)));

    registry.dispatch(&store, "projects.create");

    assert_eq!(invalidate_projects.load(Ordering::SeqCst), 1);
    assert_eq!(invalidate_analytics.load(Ordering::SeqCst), 1);
    assert_eq!(invalidate_contacts.load(Ordering::SeqCst), 0);
}

#[test]
fn pattern_invalidation_leaves_other_families_untouched() {
    init_tracing();
    let store = CacheStore::new();
    let contacts = QueryKey::new("contacts.list", &json!({})).expect("key");
    let projects = QueryKey::new("projects.list", &json!({})).expect("key");
    let ttl = Duration::from_secs(60);

    store.set(&contacts, json!(["c1"]), ttl);
    store.set(&projects, json!(["p1"]), ttl);

    store.invalidate_by_patterns(&["contacts"]);

    assert!(store.get(&contacts).is_none());
    assert_eq!(store.get(&projects), Some(json!(["p1"])));
}

#[test]
fn purged_key_reenters_fresh_on_next_write() {
    init_tracing();
    let store = CacheStore::new();
    let key = QueryKey::new("projects.list", &json!({})).expect("key");
    let ttl = Duration::from_secs(60);

    store.set(&key, json!(1), ttl);
    store.delete(&key);
    assert!(store.get(&key).is_none());

    store.set(&key, json!(2), ttl);
    assert_eq!(store.get(&key), Some(json!(2)));
}

#[tokio::test]
async fn mutation_purges_the_reads_it_affects() {
    init_tracing();
    let service = Arc::new(CacheService::new(
        CacheConfig::default(),
        InvalidationRegistry::with_default_rules(),
    ));

    // A consumer reads the project list through a live binding.
    let (tx, source) = ChannelSource::new();
    let mut project_list: CachedQuery = service
        .cached_query(
            &source,
            "projects.list",
            &json!({}),
            service.default_options(),
        )
        .expect("bind");

    tx.unbounded_send(Some(json!([{"id": "P1"}]))).expect("send");
    assert!(project_list.changed().await);
    assert_eq!(project_list.current(), Some(json!([{"id": "P1"}])));

    // An unrelated family is cached too.
    let contacts = QueryKey::new("contacts.list", &json!({})).expect("key");
    service
        .store()
        .set(&contacts, json!(["c1"]), Duration::from_secs(60));

    // A successful write dispatches its identifier automatically.
    let created: Result<(), ()> = service
        .run_mutation("projects.create", async { Ok(()) })
        .await;
    assert!(created.is_ok());

    // The project family (and analytics) are purged, contacts survive.
    let projects_key = QueryKey::new("projects.list", &json!({})).expect("key");
    assert!(service.store().get(&projects_key).is_none());
    assert_eq!(service.store().get(&contacts), Some(json!(["c1"])));

    // The binding's last fresh value is not displaced by the purge; the next
    // live delivery replaces it and re-populates the store.
    assert_eq!(project_list.current(), Some(json!([{"id": "P1"}])));
    tx.unbounded_send(Some(json!([{"id": "P1"}, {"id": "P2"}])))
        .expect("send");
    assert!(project_list.changed().await);
    assert_eq!(
        service.store().get(&projects_key),
        Some(json!([{"id": "P1"}, {"id": "P2"}]))
    );
}

#[tokio::test]
async fn failed_mutation_leaves_cache_untouched() {
    init_tracing();
    let service = CacheService::new(
        CacheConfig::default(),
        InvalidationRegistry::with_default_rules(),
    );
    let key = QueryKey::new("projects.list", &json!({})).expect("key");
    service
        .store()
        .set(&key, json!(["p1"]), Duration::from_secs(60));

    let rejected: Result<(), &str> = service
        .run_mutation("projects.create", async { Err("constraint violation") })
        .await;
    assert!(rejected.is_err());
    assert_eq!(service.store().get(&key), Some(json!(["p1"])));
}
