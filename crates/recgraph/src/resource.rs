//! Live records and the dependent-ownership graph between them.

mod graph;
mod json;
mod load;
pub(crate) use load::Load;

mod rget;
pub use rget::Related;

mod set;
pub use set::FieldValue;

use crate::blockers::SaveBlockers;
use crate::event::{Emitter, Filter};
use crate::in_flight::InFlight;
use crate::schema::Table;
use crate::{Collection, Event, ListenerId, SaveBlocker, Session};

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A live record bound to a table.
///
/// Cloning a `Resource` produces another handle to the same record.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    session: Session,
    table: Arc<Table>,
    state: Mutex<State>,
    events: Emitter,
    blockers: Mutex<SaveBlockers>,
    fetch: InFlight,
}

#[derive(Default)]
struct State {
    /// Backend id, `None` until the record is saved
    id: Option<i64>,

    /// True once backend data has been applied
    populated: bool,

    /// Literal values and relationship references keyed by lower-cased name.
    /// Embedded dependents live in `dependent` instead.
    values: IndexMap<String, Value>,

    /// Keys the table does not declare, kept as received
    extras: Map<String, Value>,

    /// Fetched or assigned objects for independent to-one relationships
    independent: HashMap<String, Resource>,

    /// Lazy collections built for independent to-many relationships
    collections: HashMap<String, Collection>,

    /// Embedded data for dependent relationships
    dependent: IndexMap<String, Dependent>,

    /// Fields modified since the last load or save
    dirty: IndexSet<String>,

    parent: Option<ParentLink>,
}

#[derive(Clone)]
enum Dependent {
    One(Resource),
    Many(Collection),
}

struct ParentLink {
    resource: WeakResource,

    /// Declared name of the parent's relationship holding this resource
    field: String,
}

/// A non-owning handle to a [`Resource`].
#[derive(Clone)]
pub(crate) struct WeakResource(Weak<Inner>);

impl Resource {
    pub(crate) fn new(session: &Session, table: Arc<Table>) -> Resource {
        let resource = Resource {
            inner: Arc::new(Inner {
                session: session.clone(),
                table,
                state: Mutex::new(State::default()),
                events: Emitter::default(),
                blockers: Mutex::new(SaveBlockers::default()),
                fetch: InFlight::default(),
            }),
        };
        session.rules().attach(&resource);
        resource
    }

    /// An unpopulated handle to an existing backend record.
    pub(crate) fn with_id(session: &Session, table: Arc<Table>, id: i64) -> Resource {
        let resource = Resource::new(session, table);
        resource.state().id = Some(id);
        resource
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.inner.table
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn id(&self) -> Option<i64> {
        self.state().id
    }

    /// True if the record has never been saved.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// The backend URL of the record, once it has an id.
    pub fn url(&self) -> Option<String> {
        self.id()
            .map(|id| self.session().resource_url(&self.table().name, id))
    }

    /// True once backend data has been loaded or saved into the resource.
    pub fn is_populated(&self) -> bool {
        self.state().populated
    }

    /// Declared names of the fields modified since the last load or save.
    ///
    /// Only covers this resource; see [`Resource::needs_saved`] for the
    /// dependent subgraph.
    pub fn dirty_fields(&self) -> Vec<String> {
        let dirty: Vec<String> = self.state().dirty.iter().cloned().collect();
        dirty
            .into_iter()
            .map(|key| match self.table().field(&key) {
                Some(field) => field.name().to_string(),
                None => key,
            })
            .collect()
    }

    /// The current value of `field`, or `None` if it is unknown to the table
    /// and was never received.
    ///
    /// Independent to-one relationships read as URLs, embedded dependents as
    /// their JSON rendering.
    pub fn get(&self, field: &str) -> Option<Value> {
        if field.eq_ignore_ascii_case("id") {
            return Some(self.id().map_or(Value::Null, Value::from));
        }
        if field.eq_ignore_ascii_case("resource_uri") {
            return Some(self.url().map_or(Value::Null, Value::String));
        }

        let table = self.table().clone();
        let Some(declared) = table.field(field) else {
            let st = self.state();
            return st
                .extras
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(field))
                .map(|(_, value)| value.clone());
        };

        let key = declared.name().to_ascii_lowercase();
        let (value, independent, dependent) = {
            let st = self.state();
            (
                st.values.get(&key).cloned(),
                st.independent.get(&key).cloned(),
                st.dependent.get(&key).cloned(),
            )
        };

        if let Some(url) = independent.and_then(|object| object.url()) {
            return Some(Value::String(url));
        }

        match dependent {
            Some(Dependent::One(child)) => Some(Value::Object(child.to_json())),
            Some(Dependent::Many(collection)) => Some(Value::Array(
                collection
                    .models()
                    .iter()
                    .map(|member| Value::Object(member.to_json()))
                    .collect(),
            )),
            None => value,
        }
    }

    /// The embedded resource of a dependent to-one relationship.
    pub fn dependent_resource(&self, field: &str) -> Option<Resource> {
        match self.state().dependent.get(&field.to_ascii_lowercase()) {
            Some(Dependent::One(child)) => Some(child.clone()),
            _ => None,
        }
    }

    /// The embedded collection of a dependent to-many relationship.
    pub fn dependent_collection(&self, field: &str) -> Option<Collection> {
        match self.state().dependent.get(&field.to_ascii_lowercase()) {
            Some(Dependent::Many(collection)) => Some(collection.clone()),
            _ => None,
        }
    }

    /// The cached object of an independent to-one relationship, if one was
    /// assigned or fetched.
    pub fn independent_resource(&self, field: &str) -> Option<Resource> {
        self.state()
            .independent
            .get(&field.to_ascii_lowercase())
            .cloned()
    }

    /// True if both handles refer to the same record instance.
    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers a listener for every event.
    pub fn on(&self, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.listen(Filter::All, Arc::new(f))
    }

    /// Registers a listener for [`Event::Change`], including changes bubbled
    /// up from dependent children.
    pub fn on_change(&self, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.listen(Filter::Change, Arc::new(f))
    }

    pub fn on_field_change(
        &self,
        field: &str,
        f: impl Fn(&Event) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listen(Filter::field(field), Arc::new(f))
    }

    /// Registers a listener for members joining the dependent collection
    /// `field`.
    pub fn on_add(&self, field: &str, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.listen(Filter::add(Some(field)), Arc::new(f))
    }

    pub fn on_remove(&self, field: &str, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.listen(Filter::remove(Some(field)), Arc::new(f))
    }

    pub fn on_loaded(&self, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.listen(Filter::Loaded, Arc::new(f))
    }

    pub fn on_saved(&self, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.listen(Filter::Saved, Arc::new(f))
    }

    pub fn on_blockers_changed(&self, f: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        self.listen(Filter::Blockers, Arc::new(f))
    }

    /// Unregisters a listener. Returns false if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.unlisten(id)
    }

    /// Attaches a blocker, replacing any blocker with the same key.
    pub fn add_blocker(&self, blocker: SaveBlocker) {
        let field = blocker.field.clone();
        let changed = self.blocker_set().add(blocker);
        if changed {
            self.emit(&Event::BlockersChanged { field });
        }
    }

    pub fn remove_blocker(&self, key: &str) {
        let removed = self.blocker_set().remove(key);
        if let Some(blocker) = removed {
            self.emit(&Event::BlockersChanged {
                field: blocker.field,
            });
        }
    }

    /// Blockers attached to this resource only.
    pub fn blockers(&self) -> Vec<SaveBlocker> {
        self.blocker_set().all()
    }

    pub fn blockers_for(&self, field: &str) -> Vec<SaveBlocker> {
        self.blocker_set().for_field(field)
    }

    pub fn has_blockers(&self) -> bool {
        !self.blocker_set().is_empty()
    }

    pub(crate) fn listen(&self, filter: Filter, callback: crate::event::Callback) -> ListenerId {
        self.inner.events.listen(filter, callback)
    }

    pub(crate) fn emit(&self, event: &Event) {
        self.inner.events.emit(event);
    }

    /// Emits a field change followed by the change bubble.
    pub(crate) fn field_changed(&self, field: &str) {
        self.emit(&Event::FieldChange {
            field: field.to_string(),
        });
        self.bubble_change();
    }

    pub(crate) fn mark_dirty(&self, field: &str) {
        self.state().dirty.insert(field.to_ascii_lowercase());
    }

    pub(crate) fn downgrade(&self) -> WeakResource {
        WeakResource(Arc::downgrade(&self.inner))
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn blocker_set(&self) -> MutexGuard<'_, SaveBlockers> {
        self.inner.blockers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WeakResource {
    pub(crate) fn upgrade(&self) -> Option<Resource> {
        self.0.upgrade().map(|inner| Resource { inner })
    }
}

impl Dependent {
    fn members(&self) -> Vec<Resource> {
        match self {
            Dependent::One(child) => vec![child.clone()],
            Dependent::Many(collection) => collection.models(),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("table", &self.table().name)
            .field("id", &self.id())
            .finish()
    }
}
