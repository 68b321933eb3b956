use super::{Schema, Table};
use crate::{Error, Result};

use std::collections::HashSet;

struct Verify<'a> {
    schema: &'a Schema,
}

impl Schema {
    pub(super) fn verify(&self) -> Result<()> {
        Verify { schema: self }.verify()
    }
}

impl Verify<'_> {
    fn verify(&self) -> Result<()> {
        for table in self.schema.tables() {
            self.verify_field_names_are_unique(table)?;
            self.verify_relationship_targets_are_registered(table)?;
        }
        Ok(())
    }

    fn verify_field_names_are_unique(&self, table: &Table) -> Result<()> {
        let mut seen = HashSet::new();
        let names = table
            .fields
            .iter()
            .map(|field| &field.name)
            .chain(table.relationships.iter().map(|rel| &rel.name));

        for name in names {
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(Error::invalid_schema(format!(
                    "field `{}.{}` is declared twice",
                    table.name, name
                )));
            }
        }
        Ok(())
    }

    fn verify_relationship_targets_are_registered(&self, table: &Table) -> Result<()> {
        for relationship in table.relationships() {
            let Some(target) = self.schema.table(&relationship.related_table) else {
                return Err(Error::invalid_schema(format!(
                    "relationship `{}.{}` targets table `{}`, which is not registered",
                    table.name, relationship.name, relationship.related_table
                )));
            };

            if let Some(other_side) = &relationship.other_side_name {
                if target.relationship(other_side).is_none() {
                    return Err(Error::invalid_schema(format!(
                        "relationship `{}.{}` names `{}.{}` as its other side, which does not exist",
                        table.name, relationship.name, target.name, other_side
                    )));
                }
            }
        }
        Ok(())
    }
}
