use tests::*;

use recgraph::{Session, UniquenessRule, UniquenessRules};
use serde_json::json;
use std::sync::Arc;

async fn builder_requires_schema_and_transport(setup: Setup) {
    let err = assert_err!(Session::builder().transport(setup.backend.clone()).build());
    assert!(err.is_schema_not_loaded());

    let err = assert_err!(Session::builder().schema(fixtures::schema()).build());
    assert!(!err.is_schema_not_loaded());

    let err = assert_err!(Session::builder()
        .schema(fixtures::schema())
        .transport(setup.backend.clone())
        .page_size(0)
        .build());
    assert!(err.to_string().contains("page size"), "{err}");
}

async fn builder_verifies_rules(setup: Setup) {
    let mut unknown_field = UniquenessRules::default();
    unknown_field.add("Agent", UniquenessRule::new(&["nickname"], None));
    let err = assert_err!(Session::builder()
        .schema(fixtures::schema())
        .transport(setup.backend.clone())
        .uniqueness_rules(unknown_field)
        .build());
    assert!(err.is_unknown_field());

    let mut unknown_table = UniquenessRules::default();
    unknown_table.add("Widget", UniquenessRule::new(&["name"], None));
    let err = assert_err!(Session::builder()
        .schema(fixtures::schema())
        .transport(setup.backend.clone())
        .uniqueness_rules(unknown_table)
        .build());
    assert!(err.is_unknown_table());

    let mut bad_scope = UniquenessRules::default();
    bad_scope.add("CollectionObject", UniquenessRule::new(&["catalogNumber"], Some("remarks")));
    assert_err!(Session::builder()
        .schema(fixtures::schema())
        .transport(setup.backend.clone())
        .uniqueness_rules(bad_scope)
        .build());

    let err = assert_err!(Session::builder()
        .schema(fixtures::schema())
        .transport(setup.backend.clone())
        .rule("Widget", recgraph::rules::ExclusiveFlag::new("isPrimary"))
        .build());
    assert!(err.is_unknown_table());
}

async fn default_config(setup: Setup) {
    let config = setup.session.config();
    assert_eq!(config.api_prefix, "/api/specify");
    assert_eq!(config.page_size, 20);
    assert_eq!(setup.session.schema().len(), 14);
    assert_eq!(
        setup.session.rules().uniqueness().rules_for("collectionobject").len(),
        1
    );
}

async fn custom_api_prefix(_setup: Setup) {
    let schema = Arc::new(fixtures::schema());
    let backend = MockBackend::with_prefix(schema.clone(), "/api/v2/");
    let session = Session::builder()
        .schema(schema)
        .transport(backend.clone())
        .api_prefix("/api/v2/")
        .build()
        .unwrap();

    let id = backend.insert("Agent", json!({ "agentType": 1, "lastName": "Smith" }));
    let agent = session.resource("agent", id).unwrap();
    assert_eq!(agent.url(), Some(format!("/api/v2/agent/{id}/")));

    agent.fetch().await.unwrap();
    assert_eq!(agent.get("lastName"), Some(json!("Smith")));
    assert_eq!(session.id_from_url(&format!("/api/v2/agent/{id}/")), Some(id));
    assert_none!(session.id_from_url(&format!("/api/specify/agent/{id}/")));
}

async fn resources_from_urls(setup: Setup) {
    let agent = assert_ok!(setup.session.resource_from_url("/api/specify/agent/12/"));
    assert_eq!(agent.table().name, "Agent");
    assert_eq!(agent.id(), Some(12));
    assert!(!agent.is_populated());

    let absolute = assert_ok!(setup
        .session
        .resource_from_url("http://localhost:8000/api/specify/collectionobject/3/"));
    assert_eq!(absolute.table().name, "CollectionObject");

    assert_err!(setup.session.resource_from_url("/api/specify/agent/"));
    assert_err!(setup.session.resource_from_url("/static/agent/1/"));
    assert!(assert_err!(setup.session.resource_from_url("/api/specify/widget/1/")).is_unknown_table());
}

async fn create_errors(setup: Setup) {
    assert!(assert_err!(setup.session.create("Widget")).is_unknown_table());
    assert_err!(setup.session.create_with("Agent", json!("Smith")));
    assert!(assert_err!(setup.session.resource("Widget", 1)).is_unknown_table());
    assert!(assert_err!(setup.session.collection::<&str, &str>("Widget", &[])).is_unknown_table());

    let agent = assert_ok!(setup
        .session
        .create_with("Agent", json!({ "LASTNAME": "Smith", "agenttype": 2 })));
    assert_eq!(agent.get("lastName"), Some(json!("Smith")));
    assert_eq!(agent.get("agentType"), Some(json!(2)));
    assert!(agent.is_new());
    assert_empty!(agent.dirty_fields());
}

tests!(
    builder_requires_schema_and_transport,
    builder_verifies_rules,
    default_config,
    custom_api_prefix,
    resources_from_urls,
    create_errors,
);
