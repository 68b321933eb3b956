//! Loads the JSON datamodel description published by the backend.

use super::{Dependency, Field, FieldType, Relationship, RelationshipKind, Schema, TableBuilder};
use crate::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableDef {
    name: String,
    table_id: u32,
    id_field_name: Option<String>,
    label: Option<String>,
    #[serde(default)]
    fields: Vec<FieldDef>,
    #[serde(default)]
    relationships: Vec<RelationshipDef>,
}

#[derive(Debug, Deserialize)]
struct FieldDef {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    required: bool,
    length: Option<usize>,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationshipDef {
    name: String,
    #[serde(rename = "type")]
    kind: RelationshipKind,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    dependent: bool,
    related_model_name: String,
    other_side_name: Option<String>,
    label: Option<String>,
}

pub(super) fn load(src: &str) -> Result<Schema> {
    let defs: Vec<TableDef> = serde_json::from_str(src)
        .map_err(|err| Error::invalid_schema(format!("malformed datamodel: {err}")))?;

    let mut builder = Schema::builder();

    for def in defs {
        let mut table = TableBuilder::new(&def.name, def.table_id);
        if let Some(id_field) = def.id_field_name {
            table = table.id_field(id_field);
        }
        if let Some(label) = def.label {
            table = table.label(label);
        }

        for field in def.fields {
            let Some(ty) = FieldType::from_java(&field.ty) else {
                return Err(Error::invalid_schema(format!(
                    "field `{}.{}` has unsupported type `{}`",
                    def.name, field.name, field.ty
                )));
            };
            let mut built = Field::new(field.name, ty);
            built.required = field.required;
            built.length = field.length;
            if let Some(label) = field.label {
                built.label = label;
            }
            table = table.field(built);
        }

        for relationship in def.relationships {
            let mut built = Relationship::new(
                relationship.name,
                relationship.kind,
                relationship.related_model_name,
            );
            built.dependency = Dependency::from_flag(relationship.dependent);
            built.required = relationship.required;
            built.other_side_name = relationship.other_side_name;
            if let Some(label) = relationship.label {
                built.label = label;
            }
            table = table.relationship(built);
        }

        builder.table(table);
    }

    builder.build()
}
