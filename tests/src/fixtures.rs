//! A slice of the collections-management datamodel used across the tests.

use recgraph::schema::{Field, FieldType, Relationship, RelationshipKind, TableBuilder};
use recgraph::{Schema, UniquenessRules};

use RelationshipKind::*;

pub fn schema() -> Schema {
    let mut builder = Schema::builder();
    builder
        .table(
            TableBuilder::new("Collection", 23)
                .field(Field::new("collectionName", FieldType::String).required().length(50))
                .field(Field::new("version", FieldType::Integer)),
        )
        .table(
            TableBuilder::new("Agent", 5)
                .field(Field::new("agentType", FieldType::Byte).required())
                .field(Field::new("firstName", FieldType::String).length(50))
                .field(Field::new("lastName", FieldType::String).length(120))
                .field(Field::new("remarks", FieldType::Text))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("addresses", OneToMany, "Address")
                        .dependent()
                        .other_side("agent"),
                )
                .relationship(Relationship::new("createdByAgent", ManyToOne, "Agent")),
        )
        .table(
            TableBuilder::new("Address", 8)
                .field(Field::new("address", FieldType::String).length(255))
                .field(Field::new("isPrimary", FieldType::Boolean))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("agent", ManyToOne, "Agent")
                        .required()
                        .other_side("addresses"),
                ),
        )
        .table(
            TableBuilder::new("CollectionObject", 1)
                .field(Field::new("catalogNumber", FieldType::String).length(10))
                .field(Field::new("remarks", FieldType::Text))
                .field(Field::new("countAmt", FieldType::Integer))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("collection", ManyToOne, "Collection")
                        .required()
                        .label("Collection"),
                )
                .relationship(Relationship::new("cataloger", ManyToOne, "Agent"))
                .relationship(
                    Relationship::new("accession", ManyToOne, "Accession").other_side("collectionObjects"),
                )
                .relationship(
                    Relationship::new("collectionObjectAttribute", ZeroToOne, "CollectionObjectAttribute")
                        .dependent(),
                )
                .relationship(
                    Relationship::new("determinations", OneToMany, "Determination")
                        .dependent()
                        .other_side("collectionObject"),
                )
                .relationship(
                    Relationship::new("preparations", OneToMany, "Preparation")
                        .dependent()
                        .other_side("collectionObject"),
                ),
        )
        .table(
            TableBuilder::new("CollectionObjectAttribute", 93)
                .field(Field::new("text1", FieldType::Text))
                .field(Field::new("number1", FieldType::Decimal))
                .field(Field::new("version", FieldType::Integer)),
        )
        .table(
            TableBuilder::new("Determination", 9)
                .field(Field::new("isCurrent", FieldType::Boolean))
                .field(Field::new("remarks", FieldType::Text))
                .field(Field::new("determinedDate", FieldType::Date))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("collectionObject", ManyToOne, "CollectionObject")
                        .required()
                        .other_side("determinations"),
                )
                .relationship(Relationship::new("taxon", ManyToOne, "Taxon"))
                .relationship(Relationship::new("determiner", ManyToOne, "Agent")),
        )
        .table(
            TableBuilder::new("Taxon", 4)
                .field(Field::new("name", FieldType::String).required().length(64))
                .field(Field::new("fullName", FieldType::String).length(255))
                .field(Field::new("rankId", FieldType::Integer))
                .field(Field::new("version", FieldType::Integer))
                .relationship(Relationship::new("parent", ManyToOne, "Taxon").other_side("children"))
                .relationship(Relationship::new("children", OneToMany, "Taxon").other_side("parent")),
        )
        .table(
            TableBuilder::new("Preparation", 63)
                .field(Field::new("countAmt", FieldType::Integer))
                .field(Field::new("remarks", FieldType::Text))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("collectionObject", ManyToOne, "CollectionObject")
                        .required()
                        .other_side("preparations"),
                )
                .relationship(Relationship::new("prepType", ManyToOne, "PrepType").required()),
        )
        .table(
            TableBuilder::new("PrepType", 65)
                .field(Field::new("name", FieldType::String).required().length(64)),
        )
        .table(
            TableBuilder::new("CollectingEvent", 10)
                .field(Field::new("stationFieldNumber", FieldType::String).length(50))
                .field(Field::new("startDate", FieldType::Date))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("collectors", OneToMany, "Collector")
                        .dependent()
                        .other_side("collectingEvent"),
                ),
        )
        .table(
            TableBuilder::new("Collector", 30)
                .field(Field::new("isPrimary", FieldType::Boolean).required())
                .field(Field::new("orderNumber", FieldType::Integer).required())
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("collectingEvent", ManyToOne, "CollectingEvent")
                        .required()
                        .other_side("collectors"),
                )
                .relationship(Relationship::new("agent", ManyToOne, "Agent").required()),
        )
        .table(
            TableBuilder::new("Loan", 52)
                .field(Field::new("loanNumber", FieldType::String).required().length(50))
                .field(Field::new("isClosed", FieldType::Boolean))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("loanPreparations", OneToMany, "LoanPreparation")
                        .dependent()
                        .other_side("loan"),
                ),
        )
        .table(
            TableBuilder::new("LoanPreparation", 53)
                .field(Field::new("quantity", FieldType::Integer))
                .field(Field::new("quantityReturned", FieldType::Integer))
                .field(Field::new("quantityResolved", FieldType::Integer))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("loan", ManyToOne, "Loan")
                        .required()
                        .other_side("loanPreparations"),
                )
                .relationship(Relationship::new("preparation", ManyToOne, "Preparation")),
        )
        .table(
            TableBuilder::new("Accession", 7)
                .field(Field::new("accessionNumber", FieldType::String).required().length(60))
                .field(Field::new("version", FieldType::Integer))
                .relationship(
                    Relationship::new("collectionObjects", OneToMany, "CollectionObject")
                        .other_side("accession"),
                ),
        );

    builder.build().expect("fixture schema is valid")
}

pub const UNIQUENESS_RULES: &str = r#"{
    "CollectionObject": [{ "fields": ["catalogNumber"], "scope": "collection" }],
    "Collector": [{ "fields": ["agent"], "scope": "collectingEvent" }],
    "Accession": [{ "fields": ["accessionNumber"] }],
    "Taxon": [{ "fields": ["name", "rankId"], "scope": "parent" }]
}"#;

pub fn uniqueness_rules() -> UniquenessRules {
    UniquenessRules::from_json(UNIQUENESS_RULES).expect("fixture rules are valid")
}
