use tests::*;

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn seed_agent(setup: &Setup) -> i64 {
    setup.backend.insert(
        "Agent",
        json!({
            "agentType": 1,
            "firstName": "Ann",
            "lastName": "Smith",
            "version": 1,
            "addresses": [{ "address": "1 Main St", "isPrimary": true }],
        }),
    )
}

async fn fetch_populates_resource(setup: Setup) {
    let id = seed_agent(&setup);
    let agent = setup.session.resource("Agent", id).unwrap();
    assert!(!agent.is_populated());
    assert!(!agent.is_new());

    let loaded = Arc::new(AtomicUsize::new(0));
    let count = loaded.clone();
    agent.on_loaded(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let fetched = assert_ok!(agent.fetch().await);
    assert!(fetched.ptr_eq(&agent));
    assert!(agent.is_populated());
    assert_eq!(agent.get("lastName"), Some(json!("Smith")));
    assert_eq!(agent.get("agentType"), Some(json!(1)));
    assert_empty!(agent.dirty_fields());
    assert_eq!(loaded.load(Ordering::SeqCst), 1);

    let addresses = assert_some!(agent.dependent_collection("addresses"));
    assert_eq!(addresses.len(), 1);
    let address = assert_some!(addresses.first());
    assert!(address.id().is_some());
    assert_eq!(address.get("address"), Some(json!("1 Main St")));
    assert!(assert_some!(address.parent()).ptr_eq(&agent));

    let log = setup.log();
    assert_eq!(log.gets(), 1);
    assert_eq!(assert_some!(log.last()).url, format!("/api/specify/agent/{id}/"));
}

async fn fetch_skips_populated_and_new(setup: Setup) {
    let id = seed_agent(&setup);
    let agent = setup.session.resource("Agent", id).unwrap();

    agent.fetch().await.unwrap();
    agent.fetch().await.unwrap();
    assert_eq!(setup.log().gets(), 1);

    agent.refetch().await.unwrap();
    assert_eq!(setup.log().gets(), 2);

    let fresh = setup.session.create("Agent").unwrap();
    fresh.fetch().await.unwrap();
    assert_eq!(setup.log().len(), 2);
}

async fn concurrent_fetches_share_request(setup: Setup) {
    let id = seed_agent(&setup);
    let agent = setup.session.resource("Agent", id).unwrap();

    let (first, second) = tokio::join!(agent.fetch(), agent.fetch());
    assert_ok!(first);
    assert_ok!(second);

    assert_eq!(setup.log().gets(), 1);
    assert!(!agent.is_fetching());
    assert_eq!(agent.get("firstName"), Some(json!("Ann")));
}

async fn fetch_missing_record(setup: Setup) {
    let agent = setup.session.resource("Agent", 404).unwrap();

    let err = assert_err!(agent.fetch().await);
    assert!(err.is_record_not_found());
    assert!(!agent.is_populated());
    assert!(!agent.is_fetching());
}

async fn concurrent_fetches_share_failure(setup: Setup) {
    let agent = setup.session.resource("Agent", 31).unwrap();

    let (first, second) = tokio::join!(agent.fetch(), agent.fetch());
    assert!(assert_err!(first).is_record_not_found());
    assert!(assert_err!(second).is_record_not_found());
    assert_eq!(setup.log().gets(), 1);
}

async fn fetch_keeps_local_edits(setup: Setup) {
    let id = seed_agent(&setup);
    let agent = setup.session.resource("Agent", id).unwrap();
    agent.fetch().await.unwrap();

    agent.set("lastName", "Jones").unwrap();
    setup.backend.insert(
        "Agent",
        json!({
            "id": id,
            "agentType": 2,
            "firstName": "Anne",
            "lastName": "Smythe",
            "version": 1,
            "addresses": [],
        }),
    );

    agent.refetch().await.unwrap();
    assert_eq!(agent.get("firstName"), Some(json!("Anne")));
    assert_eq!(agent.get("agentType"), Some(json!(2)));
    assert_eq!(agent.get("lastName"), Some(json!("Jones")));
    assert_eq!(agent.dirty_fields(), vec!["lastName".to_string()]);
}

async fn fetch_keeps_edited_dependents(setup: Setup) {
    let id = seed_agent(&setup);
    let agent = setup.session.resource("Agent", id).unwrap();
    agent.fetch().await.unwrap();

    let address = agent.dependent_collection("addresses").unwrap().first().unwrap();
    address.set("address", "2 Side St").unwrap();

    agent.refetch().await.unwrap();
    let current = agent.dependent_collection("addresses").unwrap();
    assert!(assert_some!(current.first()).ptr_eq(&address));
    assert_eq!(address.get("address"), Some(json!("2 Side St")));
}

async fn fetch_transport_failures(setup: Setup) {
    let id = seed_agent(&setup);
    let agent = setup.session.resource("Agent", id).unwrap();

    setup.backend.fail_next(500);
    let err = assert_err!(agent.fetch().await);
    assert!(err.is_transport());
    assert_eq!(err.status(), Some(500));

    setup.backend.disconnect_next();
    let err = assert_err!(agent.fetch().await);
    assert!(err.is_transport());
    assert_none!(err.status());

    assert_ok!(agent.fetch().await);
    assert!(agent.is_populated());
    assert_eq!(setup.log().gets(), 3);
}

async fn fetch_resolves_independent_reference(setup: Setup) {
    let agent = seed_agent(&setup);
    let co = setup.backend.insert(
        "CollectionObject",
        json!({
            "catalogNumber": "000000001",
            "cataloger": format!("/api/specify/agent/{agent}/"),
            "collection": null,
        }),
    );

    let object = setup.session.resource("CollectionObject", co).unwrap();
    object.fetch().await.unwrap();

    assert_eq!(
        object.get("cataloger"),
        Some(Value::String(format!("/api/specify/agent/{agent}/")))
    );
    assert_none!(object.independent_resource("cataloger"));
    assert_eq!(object.get("remarks"), Some(Value::Null));
}

tests!(
    fetch_populates_resource,
    fetch_skips_populated_and_new,
    concurrent_fetches_share_request,
    fetch_missing_record,
    concurrent_fetches_share_failure,
    fetch_keeps_local_edits,
    fetch_keeps_edited_dependents,
    fetch_transport_failures,
    fetch_resolves_independent_reference,
);
