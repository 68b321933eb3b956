use super::Name;
use serde::Deserialize;

/// A relationship field linking one table to another.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Declared name, e.g. `determinations`
    pub name: String,

    /// Cardinality of the relationship
    pub kind: RelationshipKind,

    /// Whether the related records are owned by this side
    pub dependency: Dependency,

    /// True if a related record must be present before saving
    pub required: bool,

    /// Name of the table on the other end
    pub related_table: String,

    /// Name of the inverse relationship on the related table, if any
    pub other_side_name: Option<String>,

    /// Human readable label
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum RelationshipKind {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "zero-to-one")]
    ZeroToOne,
    #[serde(rename = "many-to-one")]
    ManyToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
    #[serde(rename = "many-to-many")]
    ManyToMany,
}

/// Distinguishes owned (embedded, saved with the parent) relationships from
/// merely referenced ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    Dependent,
    Independent,
}

impl Relationship {
    pub fn new(
        name: impl Into<String>,
        kind: RelationshipKind,
        related_table: impl Into<String>,
    ) -> Relationship {
        let name = name.into();
        let label = Name::new(&name).title_case();
        Relationship {
            name,
            kind,
            dependency: Dependency::Independent,
            required: false,
            related_table: related_table.into(),
            other_side_name: None,
            label,
        }
    }

    pub fn dependent(mut self) -> Relationship {
        self.dependency = Dependency::Dependent;
        self
    }

    pub fn required(mut self) -> Relationship {
        self.required = true;
        self
    }

    pub fn other_side(mut self, name: impl Into<String>) -> Relationship {
        self.other_side_name = Some(name.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Relationship {
        self.label = label.into();
        self
    }

    pub fn is_to_many(&self) -> bool {
        self.kind.is_to_many()
    }

    pub fn is_dependent(&self) -> bool {
        self.dependency == Dependency::Dependent
    }

    pub fn is_independent(&self) -> bool {
        self.dependency == Dependency::Independent
    }
}

impl RelationshipKind {
    pub fn is_to_many(self) -> bool {
        matches!(self, RelationshipKind::OneToMany | RelationshipKind::ManyToMany)
    }
}

impl Dependency {
    pub fn from_flag(dependent: bool) -> Dependency {
        if dependent {
            Dependency::Dependent
        } else {
            Dependency::Independent
        }
    }
}
