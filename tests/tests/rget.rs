use tests::*;

use recgraph::Related;
use serde_json::{json, Value};

struct Seeded {
    agent: i64,
    object: i64,
}

fn seed(setup: &Setup) -> Seeded {
    let agent = setup.backend.insert(
        "Agent",
        json!({ "agentType": 1, "lastName": "Smith" }),
    );
    let object = setup.backend.insert(
        "CollectionObject",
        json!({
            "catalogNumber": "000000007",
            "cataloger": format!("/api/specify/agent/{agent}/"),
            "determinations": [
                { "isCurrent": true, "remarks": "first" },
                { "isCurrent": false, "remarks": "second" },
            ],
        }),
    );
    Seeded { agent, object }
}

async fn rget_follows_path(setup: Setup) {
    let seeded = seed(&setup);
    let object = setup.session.resource("CollectionObject", seeded.object).unwrap();

    let related = assert_some!(assert_ok!(object.rget("cataloger.lastName").await));
    assert_eq!(related.as_value(), Some(&json!("Smith")));
    assert_eq!(setup.log().gets(), 2);

    // The referenced record is cached on the path and not fetched again.
    let cataloger = assert_some!(assert_ok!(object.rget_resource("CATALOGER").await));
    assert_eq!(cataloger.id(), Some(seeded.agent));
    assert!(cataloger.is_populated());
    assert!(assert_some!(object.independent_resource("cataloger")).ptr_eq(&cataloger));
    assert_eq!(setup.log().gets(), 2);
}

async fn rget_empty_path_fetches_self(setup: Setup) {
    let seeded = seed(&setup);
    let object = setup.session.resource("CollectionObject", seeded.object).unwrap();

    let related = assert_some!(assert_ok!(object.rget("").await));
    let Related::Resource(resource) = related else {
        panic!("expected the resource itself");
    };
    assert!(resource.ptr_eq(&object));
    assert!(object.is_populated());
}

async fn rget_empty_to_one(setup: Setup) {
    let seeded = seed(&setup);
    let object = setup.session.resource("CollectionObject", seeded.object).unwrap();

    assert_none!(assert_ok!(object.rget_resource("accession").await));
    assert_none!(assert_ok!(object.rget("accession.accessionNumber").await));
    assert_none!(assert_ok!(object.rget_resource("collectionObjectAttribute").await));
    assert_eq!(setup.log().gets(), 1);
}

async fn rget_dependent_collection(setup: Setup) {
    let seeded = seed(&setup);
    let object = setup.session.resource("CollectionObject", seeded.object).unwrap();

    let determinations = assert_ok!(object.rget_collection("determinations").await);
    assert!(determinations.is_dependent());
    assert_eq!(determinations.len(), 2);
    assert!(determinations.is_complete());
    assert!(assert_some!(determinations.owner()).ptr_eq(&object));

    let remarks: Vec<Value> = determinations
        .models()
        .iter()
        .map(|determination| determination.get("remarks").unwrap())
        .collect();
    assert_eq!(remarks, vec![json!("first"), json!("second")]);

    // Dependents are embedded, so only the owner was requested.
    assert_eq!(setup.log().gets(), 1);
}

async fn rget_missing_dependent_collection(setup: Setup) {
    let seeded = seed(&setup);
    let object = setup.session.resource("CollectionObject", seeded.object).unwrap();

    let preparations = assert_ok!(object.rget_collection("preparations").await);
    assert!(preparations.is_empty());
    assert!(preparations.is_dependent());

    let again = assert_ok!(object.rget_collection("preparations").await);
    assert!(again.ptr_eq(&preparations));
    assert_empty!(object.dirty_fields());
}

async fn rget_independent_collection(setup: Setup) {
    let accession = setup
        .backend
        .insert("Accession", json!({ "accessionNumber": "2024-001" }));
    for number in ["1", "2", "3"] {
        setup.backend.insert(
            "CollectionObject",
            json!({
                "catalogNumber": number,
                "accession": format!("/api/specify/accession/{accession}/"),
            }),
        );
    }
    setup
        .backend
        .insert("CollectionObject", json!({ "catalogNumber": "4" }));

    let parent = setup.session.resource("Accession", accession).unwrap();
    let objects = assert_ok!(parent.rget_collection("collectionObjects").await);
    assert!(objects.is_lazy());
    assert!(objects.is_empty());
    assert_none!(objects.total_count());
    assert_eq!(
        objects.filters(),
        &[("accession".to_string(), accession.to_string())]
    );

    objects.fetch().await.unwrap();
    assert_eq!(objects.len(), 3);
    assert_eq!(objects.total_count(), Some(3));
    assert!(objects.is_complete());

    let again = assert_ok!(parent.rget_collection("collectionObjects").await);
    assert!(again.ptr_eq(&objects));

    let url = assert_some!(setup.log().last()).url;
    assert!(url.starts_with("/api/specify/collectionobject/?"), "{url}");
    assert!(url.contains(&format!("accession={accession}")), "{url}");
}

async fn rget_independent_collection_of_new_record(setup: Setup) {
    let accession = setup.session.create("Accession").unwrap();

    let objects = assert_ok!(accession.rget_collection("collectionObjects").await);
    assert!(objects.is_complete());
    assert_eq!(objects.total_count(), Some(0));

    objects.fetch().await.unwrap();
    assert!(setup.log().is_empty());
}

async fn rget_errors(setup: Setup) {
    let seeded = seed(&setup);
    let object = setup.session.resource("CollectionObject", seeded.object).unwrap();

    assert!(assert_err!(object.rget("nickname").await).is_unknown_field());
    assert_err!(object.rget("catalogNumber.length").await);
    assert_err!(object.rget("determinations.remarks").await);
    assert_err!(object.rget_resource("determinations").await);
    assert_err!(object.rget_collection("cataloger").await);
}

async fn rget_unknown_record(setup: Setup) {
    let object = setup.backend.insert(
        "CollectionObject",
        json!({ "catalogNumber": "9", "cataloger": "/api/specify/agent/999/" }),
    );
    let object = setup.session.resource("CollectionObject", object).unwrap();

    let err = assert_err!(object.rget("cataloger.lastName").await);
    assert!(err.is_record_not_found());
}

tests!(
    rget_follows_path,
    rget_empty_path_fetches_self,
    rget_empty_to_one,
    rget_dependent_collection,
    rget_missing_dependent_collection,
    rget_independent_collection,
    rget_independent_collection_of_new_record,
    rget_errors,
    rget_unknown_record,
);
