use crate::schema::FieldRef;
use crate::{bail, BlockerSource, Collection, Error, Resource, Result, SaveBlocker, Schema, Session};

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Uniqueness constraints keyed by table.
///
/// Loaded from JSON shaped like
/// `{"CollectionObject": [{"fields": ["catalogNumber"], "scope": "collection"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniquenessRules {
    by_table: HashMap<String, Vec<UniquenessRule>>,
}

/// Values of `fields` must not repeat among records sharing the same
/// `scope` relationship. Without a scope they must be unique across the
/// database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UniquenessRule {
    pub fields: Vec<String>,

    #[serde(default)]
    pub scope: Option<String>,
}

impl UniquenessRules {
    pub fn from_json(src: &str) -> Result<UniquenessRules> {
        let raw: HashMap<String, Vec<UniquenessRule>> = serde_json::from_str(src)
            .map_err(|err| Error::from(err).context("parsing uniqueness rules"))?;

        let mut rules = UniquenessRules::default();
        for (table, list) in raw {
            for rule in list {
                rules.add(&table, rule);
            }
        }
        Ok(rules)
    }

    pub fn add(&mut self, table: &str, rule: UniquenessRule) -> &mut Self {
        self.by_table
            .entry(table.to_ascii_lowercase())
            .or_default()
            .push(rule);
        self
    }

    pub fn rules_for(&self, table: &str) -> &[UniquenessRule] {
        self.by_table
            .get(&table.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_table.values().all(Vec::is_empty)
    }

    pub(crate) fn verify(&self, schema: &Schema) -> Result<()> {
        for (table, rules) in &self.by_table {
            let table = schema.expect_table(table)?;
            for rule in rules {
                if rule.fields.is_empty() {
                    bail!("uniqueness rule on {} names no fields", table.name);
                }
                for field in &rule.fields {
                    if table.field(field).is_none() {
                        return Err(Error::unknown_field(&table.name, field)
                            .context(format!("verifying uniqueness rules of {}", table.name)));
                    }
                }
                if let Some(scope) = &rule.scope {
                    match table.field(scope) {
                        Some(FieldRef::Relationship(relationship)) if !relationship.is_to_many() => {}
                        Some(_) => bail!(
                            "uniqueness scope `{}.{scope}` must be a to-one relationship",
                            table.name
                        ),
                        None => {
                            return Err(Error::unknown_field(&table.name, scope)
                                .context(format!("verifying uniqueness rules of {}", table.name)))
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Re-evaluates sibling uniqueness for rules involving `field`.
    pub(crate) fn check_local(&self, resource: &Resource, field: &str) {
        for rule in self.rules_for(&resource.table().name) {
            if rule.involves(field) && rule.is_local(resource) {
                evaluate_siblings(resource, rule);
            }
        }
    }

    /// Re-evaluates every sibling rule for a resource that just joined a
    /// collection.
    pub(crate) fn check_local_all(&self, member: &Resource) {
        for rule in self.rules_for(&member.table().name) {
            if rule.is_local(member) {
                evaluate_siblings(member, rule);
            }
        }
    }

    /// Re-evaluates sibling rules across the members of `owner`'s dependent
    /// collection `field`.
    pub(crate) fn check_siblings(&self, owner: &Resource, field: &str) {
        let Some(collection) = owner.dependent_collection(field) else {
            return;
        };
        if let Some(member) = collection.first() {
            self.check_local_all(&member);
        }
    }

    /// Clears uniqueness blockers of a resource that left its collection.
    pub(crate) fn clear_local(&self, member: &Resource) {
        for rule in self.rules_for(&member.table().name) {
            member.remove_blocker(&rule.key());
        }
    }

    /// Evaluates `rule` for `resource`, among its siblings when the scope is
    /// the owning record and with a backend query otherwise.
    pub(crate) async fn check(&self, resource: &Resource, rule: &UniquenessRule) -> Result<()> {
        if rule.is_local(resource) {
            evaluate_siblings(resource, rule);
            return Ok(());
        }

        let Some(values) = rule.signature(resource) else {
            apply(resource, rule, false);
            return Ok(());
        };

        let session = resource.session().clone();
        let table = resource.table().clone();

        let mut filters = vec![];
        for (field, value) in rule.fields.iter().zip(&values) {
            filters.push(filter(&session, resource, field, value));
        }
        if let Some(scope) = &rule.scope {
            match resource.get(scope) {
                Some(value) if !value.is_null() => filters.push(filter(&session, resource, scope, &value)),
                // Unset hierarchy scope: fall back to the logged-in domain.
                _ => filters.push(("domainfilter".to_string(), "true".to_string())),
            }
        }

        let matches = Collection::lazy(&session, table.clone(), filters);
        matches.fetch_page(2).await?;

        let own = resource.id();
        let conflict = matches.models().iter().any(|other| other.id() != own);
        debug!(table = %table.name, key = %rule.key(), conflict, "checked uniqueness");
        apply(resource, rule, conflict);
        Ok(())
    }
}

impl UniquenessRule {
    pub fn new(fields: &[&str], scope: Option<&str>) -> UniquenessRule {
        UniquenessRule {
            fields: fields.iter().map(|field| field.to_string()).collect(),
            scope: scope.map(str::to_string),
        }
    }

    pub fn involves(&self, field: &str) -> bool {
        self.fields.iter().any(|name| name.eq_ignore_ascii_case(field))
    }

    /// Blocker key shared by every evaluation of this rule.
    pub fn key(&self) -> String {
        let mut key = format!("uniqueness:{}", self.fields.join(",").to_ascii_lowercase());
        if let Some(scope) = &self.scope {
            key.push('@');
            key.push_str(&scope.to_ascii_lowercase());
        }
        key
    }

    /// True if the scope is the record owning `resource`, so uniqueness is
    /// decided among the embedded siblings.
    fn is_local(&self, resource: &Resource) -> bool {
        let (Some(scope), Some(parent_field)) = (&self.scope, resource.parent_field()) else {
            return false;
        };
        resource
            .table()
            .relationship(scope)
            .and_then(|relationship| relationship.other_side_name.as_deref())
            .is_some_and(|other| other.eq_ignore_ascii_case(&parent_field))
    }

    /// The rule's values for `resource`, or `None` when they are all empty.
    fn signature(&self, resource: &Resource) -> Option<Vec<Value>> {
        let values: Vec<Value> = self
            .fields
            .iter()
            .map(|field| resource.get(field).unwrap_or(Value::Null))
            .collect();

        let empty = values.iter().all(|value| match value {
            Value::Null => true,
            Value::String(text) => text.trim().is_empty(),
            _ => false,
        });
        (!empty).then_some(values)
    }

    fn message(&self, resource: &Resource) -> String {
        let table = resource.table();
        let scope = match &self.scope {
            None => "database".to_string(),
            Some(scope) => match table.relationship(scope) {
                Some(relationship) => resource
                    .session()
                    .schema()
                    .table(&relationship.related_table)
                    .map_or_else(|| relationship.label.clone(), |related| related.label.clone()),
                None => scope.clone(),
            },
        };

        if self.fields.len() == 1 {
            return format!("Value must be unique to {scope}");
        }

        let labels: Vec<String> = self
            .fields
            .iter()
            .map(|field| {
                table
                    .field(field)
                    .map_or_else(|| field.clone(), |declared| declared.label().to_string())
            })
            .collect();
        format!("Values of {} must be unique to {scope}", labels.join(", "))
    }
}

fn evaluate_siblings(resource: &Resource, rule: &UniquenessRule) {
    let (Some(parent), Some(parent_field)) = (resource.parent(), resource.parent_field()) else {
        return;
    };
    let Some(collection) = parent.dependent_collection(&parent_field) else {
        return;
    };

    let members = collection.models();
    let signatures: Vec<Option<Vec<Value>>> = members.iter().map(|member| rule.signature(member)).collect();

    for (index, member) in members.iter().enumerate() {
        let conflict = match &signatures[index] {
            None => false,
            Some(own) => signatures
                .iter()
                .enumerate()
                .any(|(other, signature)| other != index && signature.as_ref() == Some(own)),
        };
        apply(member, rule, conflict);
    }
}

fn apply(resource: &Resource, rule: &UniquenessRule, conflict: bool) {
    let key = rule.key();
    if !conflict {
        resource.remove_blocker(&key);
        return;
    }

    let Some(first) = rule.fields.first() else {
        return;
    };
    let field = resource
        .table()
        .field(first)
        .map_or_else(|| first.clone(), |declared| declared.name().to_string());
    resource.add_blocker(SaveBlocker::new(
        field,
        key,
        rule.message(resource),
        BlockerSource::Uniqueness,
    ));
}

fn filter(session: &Session, resource: &Resource, field: &str, value: &Value) -> (String, String) {
    let key = field.to_ascii_lowercase();
    let is_reference = resource.table().relationship(field).is_some();

    match value {
        Value::Null => (format!("{key}__isnull"), "true".to_string()),
        Value::String(text) if is_reference => match session.id_from_url(text) {
            Some(id) => (key, id.to_string()),
            None => (key, text.clone()),
        },
        Value::String(text) => (key, text.clone()),
        other => (key, other.to_string()),
    }
}
