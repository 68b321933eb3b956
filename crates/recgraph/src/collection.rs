//! Ordered sets of resources of one table.
//!
//! A dependent collection holds the embedded children of a parent record
//! and is always complete. A lazy collection mirrors a filtered backend
//! query and fills in page by page.

mod fetch;

use crate::event::{Emitter, Filter};
use crate::in_flight::InFlight;
use crate::resource::WeakResource;
use crate::schema::Table;
use crate::{bail, Event, ListenerId, Resource, Result, Session};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub struct Collection {
    inner: Arc<Inner>,
}

struct Inner {
    session: Session,
    table: Arc<Table>,
    kind: Kind,
    state: Mutex<State>,
    events: Emitter,
    fetch: InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Dependent,
    Lazy { filters: Vec<(String, String)> },
}

#[derive(Default)]
struct State {
    models: Vec<Resource>,

    /// Size of the backend result set, once a page has been fetched
    total_count: Option<usize>,

    /// Owning record and relationship name of a dependent collection
    owner: Option<(WeakResource, String)>,
}

impl Collection {
    pub(crate) fn dependent(session: &Session, table: Arc<Table>, members: Vec<Resource>) -> Collection {
        Collection::with_state(
            session,
            table,
            Kind::Dependent,
            State {
                models: members,
                ..State::default()
            },
        )
    }

    pub(crate) fn lazy(session: &Session, table: Arc<Table>, filters: Vec<(String, String)>) -> Collection {
        Collection::with_state(session, table, Kind::Lazy { filters }, State::default())
    }

    /// A lazy collection known to be empty, for the to-many side of a record
    /// that has not been saved.
    pub(crate) fn lazy_empty(session: &Session, table: Arc<Table>) -> Collection {
        Collection::with_state(
            session,
            table,
            Kind::Lazy { filters: vec![] },
            State {
                total_count: Some(0),
                ..State::default()
            },
        )
    }

    fn with_state(session: &Session, table: Arc<Table>, kind: Kind, state: State) -> Collection {
        Collection {
            inner: Arc::new(Inner {
                session: session.clone(),
                table,
                kind,
                state: Mutex::new(state),
                events: Emitter::default(),
                fetch: InFlight::default(),
            }),
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.inner.table
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn is_dependent(&self) -> bool {
        self.inner.kind == Kind::Dependent
    }

    pub fn is_lazy(&self) -> bool {
        !self.is_dependent()
    }

    /// Query filters of a lazy collection.
    pub fn filters(&self) -> &[(String, String)] {
        match &self.inner.kind {
            Kind::Lazy { filters } => filters,
            Kind::Dependent => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.state().models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records the collection holds once complete. Unknown for a
    /// lazy collection that has not been fetched.
    pub fn total_count(&self) -> Option<usize> {
        let st = self.state();
        match self.inner.kind {
            Kind::Dependent => Some(st.models.len()),
            Kind::Lazy { .. } => st.total_count,
        }
    }

    /// True if every record of the collection is materialized.
    pub fn is_complete(&self) -> bool {
        let st = self.state();
        match self.inner.kind {
            Kind::Dependent => true,
            Kind::Lazy { .. } => st.total_count == Some(st.models.len()),
        }
    }

    pub fn models(&self) -> Vec<Resource> {
        self.state().models.clone()
    }

    pub fn get(&self, index: usize) -> Option<Resource> {
        self.state().models.get(index).cloned()
    }

    pub fn first(&self) -> Option<Resource> {
        self.get(0)
    }

    pub fn contains(&self, resource: &Resource) -> bool {
        self.state().models.iter().any(|model| model.ptr_eq(resource))
    }

    /// The record owning a dependent collection.
    pub fn owner(&self) -> Option<Resource> {
        let owner = self.state().owner.as_ref().map(|(owner, _)| owner.clone());
        owner.and_then(|owner| owner.upgrade())
    }

    /// Name of the owner's relationship holding a dependent collection.
    pub fn field(&self) -> Option<String> {
        self.state().owner.as_ref().map(|(_, field)| field.clone())
    }

    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Adds `resource` to a dependent collection, marking the owner dirty.
    ///
    /// Adding a resource that is already a member does nothing. Lazy
    /// collections mirror backend data and refuse additions.
    pub fn add(&self, resource: Resource) -> Result<()> {
        if self.is_lazy() {
            bail!(
                "cannot add to a lazily loaded collection of {}; it mirrors backend data",
                self.table().name
            );
        }
        if !resource.table().name.eq_ignore_ascii_case(&self.table().name) {
            bail!(
                "cannot add a {} resource to a collection of {}",
                resource.table().name,
                self.table().name
            );
        }

        let owner = self.owner();
        if owner.as_ref().is_some_and(|owner| owner.ptr_eq(&resource)) {
            bail!("{} cannot be a member of its own collection", self.table().name);
        }

        {
            let mut st = self.state();
            if st.models.iter().any(|model| model.ptr_eq(&resource)) {
                return Ok(());
            }
            st.models.push(resource.clone());
        }

        let field = self.field().unwrap_or_default();
        if let Some(owner) = &owner {
            resource.set_parent(owner, &field);
        }

        let event = Event::Add {
            field: field.clone(),
            resource,
        };
        self.inner.events.emit(&event);
        if let Some(owner) = owner {
            owner.mark_dirty(&field);
            owner.emit(&event);
            owner.bubble_change();
        }
        Ok(())
    }

    /// Removes `resource` from a dependent collection. Returns false if it
    /// was not a member.
    pub fn remove(&self, resource: &Resource) -> Result<bool> {
        if self.is_lazy() {
            bail!(
                "cannot remove from a lazily loaded collection of {}; it mirrors backend data",
                self.table().name
            );
        }

        let removed = {
            let mut st = self.state();
            match st.models.iter().position(|model| model.ptr_eq(resource)) {
                Some(index) => Some(st.models.remove(index)),
                None => None,
            }
        };
        let Some(removed) = removed else {
            return Ok(false);
        };

        let field = self.field().unwrap_or_default();
        let owner = self.owner();
        if let Some(owner) = &owner {
            removed.detach_from(owner);
        }

        let event = Event::Remove {
            field: field.clone(),
            resource: removed,
        };
        self.inner.events.emit(&event);
        if let Some(owner) = owner {
            owner.mark_dirty(&field);
            owner.emit(&event);
            owner.bubble_change();
        }
        Ok(true)
    }

    pub fn on_add(&self, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.inner.events.listen(Filter::add(None), Arc::new(f))
    }

    pub fn on_remove(&self, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.inner.events.listen(Filter::remove(None), Arc::new(f))
    }

    /// Registers a listener for pages arriving from the backend.
    pub fn on_loaded(&self, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.inner.events.listen(Filter::Loaded, Arc::new(f))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.unlisten(id)
    }

    /// Makes `owner` the parent of the collection and of every member.
    pub(crate) fn bind(&self, owner: &Resource, field: &str) {
        let members = {
            let mut st = self.state();
            st.owner = Some((owner.downgrade(), field.to_string()));
            st.models.clone()
        };
        for member in members {
            member.set_parent(owner, field);
        }
    }

    /// Drops the owner link if it still points at `owner`.
    pub(crate) fn unbind(&self, owner: &Resource) {
        let mut st = self.state();
        let bound = st
            .owner
            .as_ref()
            .and_then(|(current, _)| current.upgrade())
            .is_some_and(|current| current.ptr_eq(owner));
        if bound {
            st.owner = None;
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("table", &self.table().name)
            .field("kind", &self.inner.kind)
            .field("len", &self.len())
            .field("total_count", &self.total_count())
            .finish()
    }
}
