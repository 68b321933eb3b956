use tests::*;

use recgraph::Event;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn seed_agents(setup: &Setup, smiths: usize) {
    for index in 0..smiths {
        setup.backend.insert(
            "Agent",
            json!({ "agentType": 1, "firstName": format!("A{index}"), "lastName": "Smith" }),
        );
    }
    setup
        .backend
        .insert("Agent", json!({ "agentType": 1, "lastName": "Jones" }));
}

async fn fetch_pages_until_complete(_setup: Setup) {
    let setup = Setup::with(|builder| {
        builder.page_size(2);
    });
    seed_agents(&setup, 5);

    let agents = setup
        .session
        .collection("Agent", &[("lastName", "Smith")])
        .unwrap();
    assert_eq!(agents.filters(), &[("lastname".to_string(), "Smith".to_string())]);
    assert!(!agents.is_complete());

    agents.fetch().await.unwrap();
    assert_eq!(agents.len(), 2);
    assert_eq!(agents.total_count(), Some(5));
    assert!(!agents.is_complete());

    agents.fetch_all().await.unwrap();
    assert_eq!(agents.len(), 5);
    assert!(agents.is_complete());
    assert_unique!(agents.models().iter().map(|agent| agent.id()).collect::<Vec<_>>());

    let urls = setup.log().urls();
    assert_eq!(urls.len(), 3);
    assert!(urls[0].ends_with("limit=2&offset=0"), "{}", urls[0]);
    assert!(urls[1].ends_with("limit=2&offset=2"), "{}", urls[1]);
    assert!(urls[2].ends_with("limit=2&offset=4"), "{}", urls[2]);

    // Complete collections do not hit the backend again.
    agents.fetch().await.unwrap();
    assert_eq!(setup.log().len(), 3);
}

async fn fetch_page_with_explicit_limit(setup: Setup) {
    seed_agents(&setup, 3);
    let agents = setup.session.collection::<&str, &str>("Agent", &[]).unwrap();

    agents.fetch_page(1).await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents.total_count(), Some(4));

    agents.fetch_page(10).await.unwrap();
    assert_eq!(agents.len(), 4);
    assert!(agents.is_complete());
}

async fn concurrent_page_fetches_share_request(setup: Setup) {
    seed_agents(&setup, 3);
    let agents = setup
        .session
        .collection("agent", &[("lastname", "Smith")])
        .unwrap();

    let (first, second) = tokio::join!(agents.fetch(), agents.fetch());
    assert_ok!(first);
    assert_ok!(second);

    assert_eq!(setup.log().gets(), 1);
    assert_eq!(agents.len(), 3);
    assert!(!agents.is_fetching());
}

async fn refetch_starts_over(setup: Setup) {
    seed_agents(&setup, 2);
    let agents = setup.session.collection("Agent", &[("lastname", "Smith")]).unwrap();
    agents.fetch().await.unwrap();
    let first = agents.first().unwrap();

    setup
        .backend
        .insert("Agent", json!({ "agentType": 1, "lastName": "Smith" }));
    agents.refetch().await.unwrap();

    assert_eq!(agents.len(), 3);
    assert!(!agents.first().unwrap().ptr_eq(&first));
    assert_eq!(setup.log().gets(), 2);
}

async fn shrinking_total_bounds_length(_setup: Setup) {
    let setup = Setup::with(|builder| {
        builder.page_size(2);
    });
    let ids: Vec<i64> = (0..5)
        .map(|index| {
            setup.backend.insert(
                "Agent",
                json!({ "agentType": 1, "firstName": format!("A{index}"), "lastName": "Smith" }),
            )
        })
        .collect();

    let agents = setup.session.collection("Agent", &[("lastname", "Smith")]).unwrap();
    agents.fetch().await.unwrap();
    assert_eq!(agents.len(), 2);
    assert_eq!(agents.total_count(), Some(5));

    for id in [ids[0], ids[2], ids[3], ids[4]] {
        assert!(setup.backend.delete("Agent", id));
    }

    agents.fetch().await.unwrap();
    assert_eq!(agents.total_count(), Some(1));
    assert!(agents.len() <= 1);
    assert!(agents.is_complete());

    // The surviving entry may be stale until the collection is refetched.
    agents.refetch().await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents.first().unwrap().id(), Some(ids[1]));
}

async fn domain_filter_is_passed_through(setup: Setup) {
    let objects = setup
        .session
        .collection("CollectionObject", &[("domainfilter", "true")])
        .unwrap();
    objects.fetch().await.unwrap();

    assert!(objects.is_empty());
    assert_eq!(objects.total_count(), Some(0));
    let url = setup.log().last().unwrap().url;
    assert!(url.contains("domainfilter=true"), "{url}");
}

async fn failed_page_fetch(setup: Setup) {
    seed_agents(&setup, 1);
    let agents = setup.session.collection::<&str, &str>("Agent", &[]).unwrap();

    setup.backend.fail_next(503);
    let err = assert_err!(agents.fetch().await);
    assert_eq!(err.status(), Some(503));
    assert!(agents.is_empty());
    assert_none!(agents.total_count());

    agents.fetch().await.unwrap();
    assert_eq!(agents.len(), 2);
}

async fn lazy_collections_are_read_only(setup: Setup) {
    let agents = setup.session.collection::<&str, &str>("Agent", &[]).unwrap();
    let agent = setup.session.create("Agent").unwrap();

    assert_err!(agents.add(agent.clone()));
    assert_err!(agents.remove(&agent));
    assert!(agents.is_empty());
}

async fn dependent_add_and_remove(setup: Setup) {
    let object = setup.session.create("CollectionObject").unwrap();
    let determinations = object.dependent_collection("determinations").unwrap();

    let events = Arc::new(Mutex::new(vec![]));
    let seen = events.clone();
    object.on_add("determinations", move |event| {
        if let Event::Add { field, .. } = event {
            seen.lock().unwrap().push(format!("add {field}"));
        }
    });
    let seen = events.clone();
    object.on_remove("Determinations", move |event| {
        if let Event::Remove { field, .. } = event {
            seen.lock().unwrap().push(format!("remove {field}"));
        }
    });
    let seen = events.clone();
    determinations.on_add(move |_| seen.lock().unwrap().push("collection add".to_string()));

    let determination = setup.session.create("Determination").unwrap();
    determinations.add(determination.clone()).unwrap();
    determinations.add(determination.clone()).unwrap();

    assert_eq!(determinations.len(), 1);
    assert!(determinations.contains(&determination));
    assert!(assert_some!(determination.parent()).ptr_eq(&object));
    assert_eq!(determination.parent_field().as_deref(), Some("determinations"));
    assert_eq!(object.dirty_fields(), vec!["determinations".to_string()]);

    assert!(assert_ok!(determinations.remove(&determination)));
    assert!(!assert_ok!(determinations.remove(&determination)));
    assert_none!(determination.parent());
    assert!(determinations.is_empty());

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "collection add".to_string(),
            "add determinations".to_string(),
            "remove determinations".to_string(),
        ]
    );
}

async fn dependent_add_checks_table(setup: Setup) {
    let object = setup.session.create("CollectionObject").unwrap();
    let determinations = object.dependent_collection("determinations").unwrap();
    let preparation = setup.session.create("Preparation").unwrap();

    assert_err!(determinations.add(preparation));
    assert!(determinations.is_empty());
    assert_empty!(object.dirty_fields());
}

tests!(
    fetch_pages_until_complete,
    fetch_page_with_explicit_limit,
    concurrent_page_fetches_share_request,
    refetch_starts_over,
    shrinking_total_bounds_length,
    domain_filter_is_passed_through,
    failed_page_fetch,
    lazy_collections_are_read_only,
    dependent_add_and_remove,
    dependent_add_checks_table,
);
