use crate::schema::{Field, FieldRef};
use crate::{BlockerSource, Resource, SaveBlocker};

use serde_json::Value;

pub(crate) const REQUIRED: &str = "Field is required.";

/// Applies the required and length constraints of the field definition.
pub(super) fn check(resource: &Resource, field: FieldRef<'_>) {
    let key = format!("field-check:{}", field.name().to_ascii_lowercase());

    let message = match field {
        FieldRef::Literal(field) => literal(resource, field),
        FieldRef::Relationship(relationship) => {
            let back_reference = resource.parent_field().is_some_and(|parent_field| {
                relationship
                    .other_side_name
                    .as_deref()
                    .is_some_and(|other| other.eq_ignore_ascii_case(&parent_field))
            });

            // The backend fills in the reference to the owning record.
            if !relationship.required || relationship.is_to_many() || back_reference {
                None
            } else {
                let value = resource.get(&relationship.name).unwrap_or(Value::Null);
                value.is_null().then(|| REQUIRED.to_string())
            }
        }
    };

    match message {
        Some(message) => resource.add_blocker(SaveBlocker::new(
            field.name(),
            key,
            message,
            BlockerSource::FieldCheck,
        )),
        None => resource.remove_blocker(&key),
    }
}

fn literal(resource: &Resource, field: &Field) -> Option<String> {
    let value = resource.get(&field.name).unwrap_or(Value::Null);

    if field.required && Field::is_blank(&value) {
        return Some(REQUIRED.to_string());
    }

    match (field.length, &value) {
        (Some(max), Value::String(text)) if text.chars().count() > max => Some(format!(
            "Value must not be longer than {max} characters."
        )),
        _ => None,
    }
}
