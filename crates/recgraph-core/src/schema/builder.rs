use super::{Field, Relationship, Schema, Table, TableId};
use crate::Result;
use std_util::str;

#[derive(Debug, Default)]
pub struct Builder {
    tables: Vec<TableBuilder>,
}

/// Describes one table before the schema is assembled.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    table_id: TableId,
    id_field: Option<String>,
    label: Option<String>,
    fields: Vec<Field>,
    relationships: Vec<Relationship>,
}

impl Builder {
    pub fn table(&mut self, table: TableBuilder) -> &mut Self {
        self.tables.push(table);
        self
    }

    /// Assemble and verify the schema.
    pub fn build(&self) -> Result<Schema> {
        let mut schema = Schema::default();

        for table in &self.tables {
            schema.insert(table.clone().into_table())?;
        }

        schema.verify()?;
        Ok(schema)
    }
}

impl TableBuilder {
    pub fn new(name: impl Into<String>, table_id: u32) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            table_id: TableId(table_id),
            id_field: None,
            label: None,
            fields: vec![],
            relationships: vec![],
        }
    }

    /// Defaults to `<tableName>Id`, e.g. `collectionObjectId`.
    pub fn id_field(mut self, name: impl Into<String>) -> TableBuilder {
        self.id_field = Some(name.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> TableBuilder {
        self.label = Some(label.into());
        self
    }

    pub fn field(mut self, field: Field) -> TableBuilder {
        self.fields.push(field);
        self
    }

    pub fn relationship(mut self, relationship: Relationship) -> TableBuilder {
        self.relationships.push(relationship);
        self
    }

    fn into_table(self) -> Table {
        let id_field = self
            .id_field
            .unwrap_or_else(|| format!("{}Id", str::camel_case(&self.name)));

        Table::new(
            self.name,
            self.table_id,
            id_field,
            self.label,
            self.fields,
            self.relationships,
        )
    }
}
