use crate::Resource;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Notification emitted by a [`Resource`] or [`crate::Collection`].
///
/// Listeners run synchronously, in registration order, on the thread that
/// performed the mutation.
#[derive(Debug, Clone)]
pub enum Event {
    /// Something about the resource changed, including changes bubbled up
    /// from dependent children.
    Change,

    /// A field was assigned a new value.
    FieldChange { field: String },

    /// A resource joined a dependent collection.
    Add { field: String, resource: Resource },

    /// A resource left a dependent collection.
    Remove { field: String, resource: Resource },

    /// The blockers attached to a field changed.
    BlockersChanged { field: String },

    /// Backend data was loaded into the resource.
    Loaded,

    /// The resource was saved and reconciled with the backend response.
    Saved,
}

/// Handle returned when registering a listener, used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Filter {
    All,
    Change,
    Field(String),
    Add(Option<String>),
    Remove(Option<String>),
    Blockers,
    Loaded,
    Saved,
}

struct Listener {
    id: ListenerId,
    filter: Filter,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct Emitter {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl Event {
    pub fn field(&self) -> Option<&str> {
        match self {
            Event::FieldChange { field }
            | Event::Add { field, .. }
            | Event::Remove { field, .. }
            | Event::BlockersChanged { field } => Some(field),
            _ => None,
        }
    }
}

impl Filter {
    pub(crate) fn field(name: &str) -> Filter {
        Filter::Field(name.to_ascii_lowercase())
    }

    pub(crate) fn add(name: Option<&str>) -> Filter {
        Filter::Add(name.map(str::to_ascii_lowercase))
    }

    pub(crate) fn remove(name: Option<&str>) -> Filter {
        Filter::Remove(name.map(str::to_ascii_lowercase))
    }

    fn matches(&self, event: &Event) -> bool {
        let same = |want: &Option<String>, field: &str| {
            want.as_deref()
                .map_or(true, |want| want.eq_ignore_ascii_case(field))
        };

        match (self, event) {
            (Filter::All, _) => true,
            (Filter::Change, Event::Change) => true,
            (Filter::Field(want), Event::FieldChange { field }) => want.eq_ignore_ascii_case(field),
            (Filter::Add(want), Event::Add { field, .. }) => same(want, field),
            (Filter::Remove(want), Event::Remove { field, .. }) => same(want, field),
            (Filter::Blockers, Event::BlockersChanged { .. }) => true,
            (Filter::Loaded, Event::Loaded) => true,
            (Filter::Saved, Event::Saved) => true,
            _ => false,
        }
    }
}

impl Emitter {
    pub(crate) fn listen(&self, filter: Filter, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Listener {
            id,
            filter,
            callback,
        });
        id
    }

    pub(crate) fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    /// Calls every matching listener. The listener list is snapshotted first
    /// so callbacks may register or remove listeners.
    pub(crate) fn emit(&self, event: &Event) {
        let callbacks: Vec<Callback> = self
            .lock()
            .iter()
            .filter(|listener| listener.filter.matches(event))
            .map(|listener| listener.callback.clone())
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
