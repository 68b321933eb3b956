use super::{Dependent, ParentLink, Resource};
use crate::schema::Relationship;
use crate::{Collection, Event, SaveBlocker};

use serde_json::Value;
use std::collections::HashSet;
use tracing::trace;

impl Resource {
    /// The resource owning this one through a dependent relationship.
    pub fn parent(&self) -> Option<Resource> {
        let link = self.state().parent.as_ref().map(|link| link.resource.clone());
        link.and_then(|link| link.upgrade())
    }

    /// Declared name of the parent relationship holding this resource.
    pub fn parent_field(&self) -> Option<String> {
        self.state().parent.as_ref().map(|link| link.field.clone())
    }

    pub(crate) fn set_parent(&self, parent: &Resource, field: &str) {
        self.state().parent = Some(ParentLink {
            resource: parent.downgrade(),
            field: field.to_string(),
        });
    }

    /// Clears the parent link if it still points at `parent`.
    pub(crate) fn detach_from(&self, parent: &Resource) {
        let mut st = self.state();
        let owned_by = st
            .parent
            .as_ref()
            .and_then(|link| link.resource.upgrade())
            .is_some_and(|owner| owner.ptr_eq(parent));
        if owned_by {
            st.parent = None;
        }
    }

    /// Emits [`Event::Change`] on this resource and then on each dependent
    /// ancestor in turn.
    pub(crate) fn bubble_change(&self) {
        let mut visited = HashSet::new();
        let mut current = Some(self.clone());

        while let Some(resource) = current {
            if !visited.insert(resource.addr()) {
                break;
            }
            resource.emit(&Event::Change);
            current = resource.parent();
        }
    }

    /// Direct dependent children: embedded to-one resources and the members
    /// of embedded collections.
    pub(crate) fn dependent_children(&self) -> Vec<Resource> {
        let dependents: Vec<Dependent> = self.state().dependent.values().cloned().collect();
        dependents.iter().flat_map(Dependent::members).collect()
    }

    /// This resource followed by every dependent descendant, each visited
    /// once.
    pub(crate) fn dependent_subgraph(&self) -> Vec<Resource> {
        let mut seen = HashSet::new();
        let mut out = vec![];
        let mut stack = vec![self.clone()];

        while let Some(resource) = stack.pop() {
            if !seen.insert(resource.addr()) {
                continue;
            }
            let children = resource.dependent_children();
            stack.extend(children.into_iter().rev());
            out.push(resource);
        }

        out
    }

    /// True if this resource or any dependent descendant has unsaved
    /// modifications.
    pub fn needs_saved(&self) -> bool {
        self.dependent_subgraph()
            .iter()
            .any(|resource| !resource.state().dirty.is_empty())
    }

    /// Blockers of this resource and of every dependent descendant.
    pub fn deep_blockers(&self) -> Vec<(Resource, SaveBlocker)> {
        self.dependent_subgraph()
            .into_iter()
            .flat_map(|resource| {
                resource
                    .blockers()
                    .into_iter()
                    .map(move |blocker| (resource.clone(), blocker))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Installs `child` as the embedded value of a dependent to-one
    /// relationship, or records `display` when there is none. Returns true
    /// if anything changed.
    pub(crate) fn replace_dependent_one(
        &self,
        relationship: &Relationship,
        child: Option<Resource>,
        display: Value,
    ) -> bool {
        let key = relationship.name.to_ascii_lowercase();
        let (previous, old) = {
            let mut st = self.state();
            let previous = st.values.get(&key).cloned();
            let old = st.dependent.shift_remove(&key);
            match &child {
                Some(child) => {
                    st.dependent.insert(key.clone(), Dependent::One(child.clone()));
                    st.values.shift_remove(&key);
                }
                None => {
                    st.values.insert(key.clone(), display.clone());
                }
            }
            (previous, old)
        };

        let changed = match (&old, &child) {
            (Some(Dependent::One(old)), Some(child)) => !old.ptr_eq(child),
            (None, None) => previous.as_ref() != Some(&display),
            _ => true,
        };

        self.release(old, child.as_slice());
        if let Some(child) = &child {
            child.set_parent(self, &relationship.name);
        }
        changed
    }

    /// Installs `collection` as the embedded value of a dependent to-many
    /// relationship, or records `display` when there is none.
    pub(crate) fn replace_dependent_many(
        &self,
        relationship: &Relationship,
        collection: Option<Collection>,
        display: Value,
    ) -> bool {
        let key = relationship.name.to_ascii_lowercase();
        let old = {
            let mut st = self.state();
            let old = st.dependent.shift_remove(&key);
            match &collection {
                Some(collection) => {
                    st.dependent
                        .insert(key.clone(), Dependent::Many(collection.clone()));
                    st.values.shift_remove(&key);
                }
                None => {
                    st.values.insert(key.clone(), display);
                }
            }
            old
        };

        if let Some(Dependent::Many(previous)) = &old {
            let reused = collection
                .as_ref()
                .is_some_and(|collection| collection.ptr_eq(previous));
            if !reused {
                previous.unbind(self);
            }
        }

        let keep = collection.as_ref().map(Collection::models).unwrap_or_default();
        self.release(old, &keep);
        if let Some(collection) = &collection {
            collection.bind(self, &relationship.name);
        }
        true
    }

    /// Sets the reference of an independent to-one relationship together
    /// with its cached object. Returns true if either changed.
    pub(crate) fn replace_independent(
        &self,
        relationship: &Relationship,
        object: Option<Resource>,
        value: Value,
    ) -> bool {
        let key = relationship.name.to_ascii_lowercase();
        let mut st = self.state();
        let previous_value = st.values.insert(key.clone(), value.clone());
        let previous_object = match &object {
            Some(object) => st.independent.insert(key, object.clone()),
            None => st.independent.remove(&key),
        };

        let same_object = match (&previous_object, &object) {
            (Some(previous), Some(object)) => previous.ptr_eq(object),
            (None, None) => true,
            _ => false,
        };
        previous_value.as_ref() != Some(&value) || !same_object
    }

    /// The cached object of an independent relationship, if it is still the
    /// record `url` points at.
    pub(crate) fn cached_for_url(&self, relationship: &Relationship, url: &str) -> Option<Resource> {
        let cached = self.independent_resource(&relationship.name)?;
        let id = self.session().id_from_url(url);
        if id.is_some() && cached.id() == id {
            Some(cached)
        } else {
            trace!(
                table = %self.table().name,
                field = %relationship.name,
                "dropping cached object for changed reference"
            );
            None
        }
    }

    fn release(&self, old: Option<Dependent>, keep: &[Resource]) {
        let Some(old) = old else { return };
        for member in old.members() {
            if !keep.iter().any(|kept| kept.ptr_eq(&member)) {
                member.detach_from(self);
            }
        }
    }
}
