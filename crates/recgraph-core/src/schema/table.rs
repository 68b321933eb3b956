use super::{Field, Name, Relationship};
use std::collections::HashMap;
use std::fmt;

/// Schema metadata for one record kind.
#[derive(Debug)]
pub struct Table {
    /// Declared name, e.g. `CollectionObject`
    pub name: String,

    /// Numeric id assigned by the backend
    pub table_id: TableId,

    /// Name of the primary key field, e.g. `collectionObjectId`
    pub id_field: String,

    /// Human readable label, e.g. `Collection Object`
    pub label: String,

    pub fields: Vec<Field>,

    pub relationships: Vec<Relationship>,

    /// Lower-cased field name to slot
    lookup: HashMap<String, Slot>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

#[derive(Debug, Clone, Copy)]
enum Slot {
    Literal(usize),
    Relationship(usize),
}

/// A field of a table, either literal or relationship.
#[derive(Debug, Clone, Copy)]
pub enum FieldRef<'a> {
    Literal(&'a Field),
    Relationship(&'a Relationship),
}

impl Table {
    pub(super) fn new(
        name: String,
        table_id: TableId,
        id_field: String,
        label: Option<String>,
        fields: Vec<Field>,
        relationships: Vec<Relationship>,
    ) -> Table {
        let label = label.unwrap_or_else(|| Name::new(&name).title_case());
        let mut lookup = HashMap::new();
        for (index, field) in fields.iter().enumerate() {
            lookup.insert(field.name.to_ascii_lowercase(), Slot::Literal(index));
        }
        for (index, relationship) in relationships.iter().enumerate() {
            lookup.insert(
                relationship.name.to_ascii_lowercase(),
                Slot::Relationship(index),
            );
        }

        Table {
            name,
            table_id,
            id_field,
            label,
            fields,
            relationships,
            lookup,
        }
    }

    /// Lower-cased name used in URLs and wire records.
    pub fn wire_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Find a field or relationship by name, ignoring case.
    pub fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match self.lookup.get(&name.to_ascii_lowercase())? {
            Slot::Literal(index) => Some(FieldRef::Literal(&self.fields[*index])),
            Slot::Relationship(index) => {
                Some(FieldRef::Relationship(&self.relationships[*index]))
            }
        }
    }

    pub fn literal(&self, name: &str) -> Option<&Field> {
        match self.field(name)? {
            FieldRef::Literal(field) => Some(field),
            FieldRef::Relationship(_) => None,
        }
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        match self.field(name)? {
            FieldRef::Relationship(relationship) => Some(relationship),
            FieldRef::Literal(_) => None,
        }
    }

    /// Literal fields, excluding the primary key.
    pub fn literal_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|field| !field.name.eq_ignore_ascii_case(&self.id_field))
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn is_id_field(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case("id") || name.eq_ignore_ascii_case(&self.id_field)
    }
}

impl<'a> FieldRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            FieldRef::Literal(field) => &field.name,
            FieldRef::Relationship(relationship) => &relationship.name,
        }
    }

    pub fn label(&self) -> &'a str {
        match self {
            FieldRef::Literal(field) => &field.label,
            FieldRef::Relationship(relationship) => &relationship.label,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            FieldRef::Literal(field) => field.required,
            FieldRef::Relationship(relationship) => relationship.required,
        }
    }

    pub fn as_relationship(&self) -> Option<&'a Relationship> {
        match self {
            FieldRef::Relationship(relationship) => Some(relationship),
            FieldRef::Literal(_) => None,
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
