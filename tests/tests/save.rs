use tests::*;

use recgraph::transport::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Counts `INFO` events emitted by the library crates.
#[derive(Clone, Default)]
struct InfoCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for InfoCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == tracing::Level::INFO && meta.target().starts_with("recgraph") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn save_new_record_posts(setup: Setup) {
    let agent = setup.session.create("Agent").unwrap();
    agent.set("lastName", "Smith").unwrap();

    let saved = Arc::new(AtomicUsize::new(0));
    let count = saved.clone();
    agent.on_saved(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let canonical = assert_ok!(agent.save().await);

    let request = assert_some!(setup.log().last());
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "/api/specify/agent/");
    let body = assert_some!(request.body);
    assert_eq!(body["lastname"], json!("Smith"));
    assert!(body.get("id").is_none());

    let id = assert_some!(agent.id());
    assert!(!agent.is_new());
    assert!(agent.is_populated());
    assert_empty!(agent.dirty_fields());
    assert_eq!(agent.get("version"), Some(json!(1)));
    assert_eq!(canonical["id"], json!(id));
    assert_eq!(canonical["_tableName"], json!("Agent"));
    assert_eq!(saved.load(Ordering::SeqCst), 1);

    let stored = assert_some!(setup.backend.record("Agent", id));
    assert_eq!(stored["lastname"], json!("Smith"));
}

async fn save_logs_below_info(setup: Setup) {
    let counter = InfoCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let agent = setup.session.create("Agent").unwrap();
    agent.set("lastName", "Smith").unwrap();
    assert_ok!(agent.save().await);
    agent.set("firstName", "Ann").unwrap();
    assert_ok!(agent.save().await);

    assert_eq!(setup.log().len(), 2);
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
}

async fn save_existing_record_puts(setup: Setup) {
    let id = setup.backend.insert(
        "Agent",
        json!({ "agentType": 1, "lastName": "Smith", "version": 1 }),
    );
    let agent = setup.session.resource("Agent", id).unwrap();
    agent.fetch().await.unwrap();
    agent.set("firstName", "Ann").unwrap();

    assert_ok!(setup.session.save(&agent).await);

    let request = assert_some!(setup.log().last());
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.url, format!("/api/specify/agent/{id}/"));
    assert_eq!(agent.get("version"), Some(json!(2)));
    assert_eq!(agent.get("firstName"), Some(json!("Ann")));
    assert_empty!(agent.dirty_fields());
    assert!(!agent.needs_saved());
}

async fn save_embeds_dependents(setup: Setup) {
    let object = setup.session.create("CollectionObject").unwrap();
    object.set("collection", "/api/specify/collection/4/").unwrap();
    object.set("catalogNumber", "000000010").unwrap();

    let determination = setup.session.create("Determination").unwrap();
    determination.set("remarks", "first look").unwrap();
    object
        .dependent_collection("determinations")
        .unwrap()
        .add(determination.clone())
        .unwrap();
    object
        .set("collectionObjectAttribute", json!({ "text1": "pressed" }))
        .unwrap();

    assert_ok!(object.save().await);

    let body = assert_some!(setup.log().last().unwrap().body);
    assert_eq!(body["determinations"][0]["remarks"], json!("first look"));
    assert_eq!(body["collectionobjectattribute"]["text1"], json!("pressed"));
    assert_eq!(body["collection"], json!("/api/specify/collection/4/"));

    let id = assert_some!(object.id());
    let determinations = object.dependent_collection("determinations").unwrap();
    assert_eq!(determinations.len(), 1);
    let saved = determinations.first().unwrap();
    assert!(saved.id().is_some());
    assert!(assert_some!(saved.parent()).ptr_eq(&object));
    assert_eq!(
        saved.get("collectionObject"),
        Some(Value::String(format!("/api/specify/collectionobject/{id}/")))
    );

    let attribute = assert_some!(object.dependent_resource("collectionObjectAttribute"));
    assert!(attribute.id().is_some());
    assert!(!object.needs_saved());

    assert_eq!(setup.backend.count("Determination"), 1);
    assert_eq!(setup.backend.count("CollectionObjectAttribute"), 1);
}

async fn save_refused_while_blocked(setup: Setup) {
    let object = setup.session.create("CollectionObject").unwrap();
    object.set("collection", "/api/specify/collection/4/").unwrap();
    object.set("catalogNumber", "12345678901").unwrap();

    let blockers = object.blockers_for("catalogNumber");
    assert_eq!(blockers.len(), 1);
    assert_eq!(blockers[0].message, "Value must not be longer than 10 characters.");

    let err = assert_err!(object.save().await);
    assert!(err.is_save_blocked());
    assert_eq!(
        err.to_string(),
        "save blocked: CollectionObject has unresolved blockers on catalogNumber"
    );
    assert!(setup.log().is_empty());
    assert!(object.is_new());

    object.set("catalogNumber", "1234567890").unwrap();
    assert!(!object.has_blockers());
    assert_ok!(object.save().await);
    assert_eq!(setup.log().posts(), 1);
}

async fn save_refused_for_blocked_dependent(setup: Setup) {
    let object = setup.session.create("CollectionObject").unwrap();
    object.set("collection", "/api/specify/collection/4/").unwrap();

    let preparation = setup.session.create("Preparation").unwrap();
    object
        .dependent_collection("preparations")
        .unwrap()
        .add(preparation.clone())
        .unwrap();
    preparation.check_field("prepType").await.unwrap();
    preparation.check_field("collectionObject").await.unwrap();
    assert_eq!(preparation.blockers().len(), 1);
    // The back-reference to the owner is filled in by the backend.
    assert_empty!(preparation.blockers_for("collectionObject"));

    let blocked = object.deep_blockers();
    assert_eq!(blocked.len(), 1);
    assert!(blocked[0].0.ptr_eq(&preparation));

    let err = assert_err!(object.save().await);
    assert!(err.is_save_blocked());
    assert!(err.to_string().ends_with("Preparation.prepType"), "{err}");
    assert!(setup.log().is_empty());

    preparation.set("prepType", "/api/specify/preptype/1/").unwrap();
    assert_ok!(object.save().await);
}

async fn save_transport_failure_keeps_state(setup: Setup) {
    let agent = setup.session.create("Agent").unwrap();
    agent.set("lastName", "Smith").unwrap();

    setup.backend.fail_next(500);
    let err = assert_err!(agent.save().await);
    assert!(err.is_transport());
    assert_eq!(err.status(), Some(500));
    assert!(agent.is_new());
    assert_eq!(agent.dirty_fields(), vec!["lastName".to_string()]);

    setup.backend.disconnect_next();
    assert!(assert_err!(agent.save().await).is_transport());

    assert_ok!(agent.save().await);
    assert_eq!(setup.backend.count("Agent"), 1);
}

async fn save_response_replaces_local_state(setup: Setup) {
    let id = setup.backend.insert(
        "Agent",
        json!({
            "agentType": 1,
            "lastName": "Smith",
            "addresses": [{ "address": "1 Main St" }],
        }),
    );
    let agent = setup.session.resource("Agent", id).unwrap();
    agent.fetch().await.unwrap();
    let old_address = agent.dependent_collection("addresses").unwrap().first().unwrap();

    agent.set("remarks", "moved").unwrap();
    agent.save().await.unwrap();

    let addresses = agent.dependent_collection("addresses").unwrap();
    assert_eq!(addresses.len(), 1);
    let new_address = addresses.first().unwrap();
    assert!(!new_address.ptr_eq(&old_address));
    assert_eq!(new_address.id(), old_address.id());
    assert_none!(old_address.parent());
    assert_eq!(agent.get("remarks"), Some(json!("moved")));
}

tests!(
    save_new_record_posts,
    save_logs_below_info,
    save_existing_record_puts,
    save_embeds_dependents,
    save_refused_while_blocked,
    save_refused_for_blocked_dependent,
    save_transport_failure_keeps_state,
    save_response_replaces_local_state,
);
