//! Validation and table-specific reactions to field changes.
//!
//! Synchronous checks run from inside the field-change notification: field
//! requirements, registered [`FieldRule`]s and uniqueness among embedded
//! siblings. Uniqueness against the backend needs a query and only runs
//! through [`BusinessRules::check_field`] and [`BusinessRules::check_all`].

mod builtin;
pub use builtin::{ExclusiveFlag, QuantityClamp};

mod field_check;

mod uniqueness;
pub use uniqueness::{UniquenessRule, UniquenessRules};

use crate::event::Filter;
use crate::{Error, Event, Resource, Result};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// A table-specific reaction to changes.
pub trait FieldRule: Send + Sync + 'static {
    /// Called after `field` of `resource` changed.
    fn field_changed(&self, resource: &Resource, field: &str) -> Result<()>;

    /// Called after `resource` joined a dependent collection.
    fn member_added(&self, resource: &Resource) -> Result<()> {
        let _ = resource;
        Ok(())
    }
}

pub struct BusinessRules {
    uniqueness: UniquenessRules,

    /// Registered rules keyed by lower-cased table name
    by_table: HashMap<String, Vec<Arc<dyn FieldRule>>>,
}

impl BusinessRules {
    pub(crate) fn new(
        uniqueness: UniquenessRules,
        custom: Vec<(String, Arc<dyn FieldRule>)>,
        defaults: bool,
    ) -> BusinessRules {
        let mut by_table: HashMap<String, Vec<Arc<dyn FieldRule>>> = HashMap::new();

        let builtin = if defaults { builtin::defaults() } else { vec![] };
        for (table, rule) in builtin.into_iter().chain(custom) {
            by_table
                .entry(table.to_ascii_lowercase())
                .or_default()
                .push(rule);
        }

        BusinessRules {
            uniqueness,
            by_table,
        }
    }

    pub fn uniqueness(&self) -> &UniquenessRules {
        &self.uniqueness
    }

    /// Hooks the synchronous checks into a new resource's notifications.
    pub(crate) fn attach(&self, resource: &Resource) {
        let weak = resource.downgrade();
        resource.listen(
            Filter::All,
            Arc::new(move |event: &Event| {
                let Some(resource) = weak.upgrade() else {
                    return;
                };
                let rules = resource.session().rules();
                match event {
                    Event::FieldChange { field } => rules.field_changed(&resource, field),
                    Event::Add { resource: member, .. } => rules.member_added(member),
                    Event::Remove {
                        field,
                        resource: member,
                    } => {
                        rules.uniqueness.clear_local(member);
                        rules.uniqueness.check_siblings(&resource, field);
                    }
                    _ => {}
                }
            }),
        );
    }

    /// Runs the synchronous checks for `field` of `resource`.
    pub fn field_changed(&self, resource: &Resource, field: &str) {
        let table = resource.table().clone();
        let Some(declared) = table.field(field) else {
            return;
        };

        for rule in self.rules_for(&table.name) {
            if let Err(err) = rule.field_changed(resource, declared.name()) {
                warn!(table = %table.name, field = %declared.name(), %err, "business rule failed");
            }
        }

        field_check::check(resource, declared);
        self.uniqueness.check_local(resource, declared.name());
    }

    fn member_added(&self, member: &Resource) {
        for rule in self.rules_for(&member.table().name) {
            if let Err(err) = rule.member_added(member) {
                warn!(table = %member.table().name, %err, "business rule failed");
            }
        }
        self.uniqueness.check_local_all(member);
    }

    /// Runs every check for `field`, including uniqueness rules that need a
    /// backend query.
    pub async fn check_field(&self, resource: &Resource, field: &str) -> Result<()> {
        let table = resource.table().clone();
        let declared = table
            .field(field)
            .ok_or_else(|| Error::unknown_field(&table.name, field))?;

        self.field_changed(resource, declared.name());
        for rule in self.uniqueness.rules_for(&table.name) {
            if rule.involves(declared.name()) {
                self.uniqueness.check(resource, rule).await?;
            }
        }
        Ok(())
    }

    /// Runs every check on `resource` and its dependent descendants.
    pub async fn check_all(&self, resource: &Resource) -> Result<()> {
        for member in resource.dependent_subgraph() {
            let table = member.table().clone();
            let fields = table
                .literal_fields()
                .map(|field| field.name.as_str())
                .chain(table.relationships().map(|relationship| relationship.name.as_str()));
            for field in fields {
                self.field_changed(&member, field);
            }

            for rule in self.uniqueness.rules_for(&table.name) {
                self.uniqueness.check(&member, rule).await?;
            }
        }
        Ok(())
    }

    fn rules_for(&self, table: &str) -> Vec<Arc<dyn FieldRule>> {
        self.by_table
            .get(&table.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

impl Resource {
    /// Runs every check for `field`. See [`BusinessRules::check_field`].
    pub async fn check_field(&self, field: &str) -> Result<()> {
        let session = self.session().clone();
        session.rules().check_field(self, field).await
    }

    /// Runs every check on the resource and its dependent descendants.
    pub async fn check_all(&self) -> Result<()> {
        let session = self.session().clone();
        session.rules().check_all(self).await
    }
}
