use super::FieldRule;
use crate::{Resource, Result};

use serde_json::Value;
use std::sync::Arc;

pub(super) fn defaults() -> Vec<(String, Arc<dyn FieldRule>)> {
    let quantities: Arc<dyn FieldRule> = Arc::new(QuantityClamp);
    let current_determination: Arc<dyn FieldRule> = Arc::new(ExclusiveFlag::new("isCurrent"));
    let primary_collector: Arc<dyn FieldRule> = Arc::new(ExclusiveFlag::new("isPrimary"));

    vec![
        ("LoanPreparation".to_string(), quantities),
        ("Determination".to_string(), current_determination),
        ("Collector".to_string(), primary_collector),
    ]
}

/// Keeps the returned and resolved counts of a loan preparation within its
/// quantity: `0 <= quantityReturned <= quantity` and
/// `quantityReturned <= quantityResolved <= quantity`.
///
/// Unset counts are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuantityClamp;

impl FieldRule for QuantityClamp {
    fn field_changed(&self, resource: &Resource, field: &str) -> Result<()> {
        let watched = ["quantity", "quantityReturned", "quantityResolved"];
        if !watched.iter().any(|name| name.eq_ignore_ascii_case(field)) {
            return Ok(());
        }

        let quantity = int(resource, "quantity").map(|quantity| quantity.max(0));

        let mut returned = int(resource, "quantityReturned");
        if let Some(current) = returned {
            let clamped = current.clamp(0, quantity.unwrap_or(i64::MAX));
            if clamped != current {
                resource.set("quantityReturned", clamped)?;
                returned = Some(clamped);
            }
        }

        if let Some(current) = int(resource, "quantityResolved") {
            let low = returned.unwrap_or(0);
            let high = quantity.map_or(i64::MAX, |quantity| quantity.max(low));
            let clamped = current.clamp(low, high);
            if clamped != current {
                resource.set("quantityResolved", clamped)?;
            }
        }

        Ok(())
    }
}

fn int(resource: &Resource, field: &str) -> Option<i64> {
    resource.get(field).as_ref().and_then(Value::as_i64)
}

/// Allows at most one member of a dependent collection to have a boolean
/// flag set. Setting the flag on one member clears it on its siblings.
#[derive(Debug, Clone)]
pub struct ExclusiveFlag {
    field: String,
}

impl ExclusiveFlag {
    pub fn new(field: impl Into<String>) -> ExclusiveFlag {
        ExclusiveFlag {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl FieldRule for ExclusiveFlag {
    fn field_changed(&self, resource: &Resource, field: &str) -> Result<()> {
        if !field.eq_ignore_ascii_case(&self.field) {
            return Ok(());
        }
        if resource.get(&self.field) != Some(Value::Bool(true)) {
            return Ok(());
        }

        let (Some(parent), Some(parent_field)) = (resource.parent(), resource.parent_field()) else {
            return Ok(());
        };
        let Some(siblings) = parent.dependent_collection(&parent_field) else {
            return Ok(());
        };

        for sibling in siblings.models() {
            if sibling.ptr_eq(resource) {
                continue;
            }
            if sibling.get(&self.field) == Some(Value::Bool(true)) {
                sibling.set(&self.field, false)?;
            }
        }
        Ok(())
    }

    fn member_added(&self, resource: &Resource) -> Result<()> {
        let field = self.field.clone();
        self.field_changed(resource, &field)
    }
}
