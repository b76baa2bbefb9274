//! Object groups (memory pools of remote handles)

use super::value::RemoteObject;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Named pool of handles released together
#[derive(Debug)]
pub struct ObjectGroup {
    /// Group name; `None` is the anonymous group
    name: Option<String>,
    /// Members keyed by remote id
    members: Mutex<HashMap<String, Arc<RemoteObject>>>,
    released: AtomicBool,
}

impl ObjectGroup {
    pub(crate) fn new(name: Option<String>) -> Self {
        Self {
            name,
            members: Mutex::new(HashMap::new()),
            released: AtomicBool::new(false),
        }
    }

    fn members(&self) -> MutexGuard<'_, HashMap<String, Arc<RemoteObject>>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Group name; `None` is the anonymous group
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True if releasing this group would release `object`
    pub fn includes(&self, object: &RemoteObject) -> bool {
        self.members()
            .get(object.remote_id())
            .is_some_and(|member| std::ptr::eq(Arc::as_ptr(member), object))
    }

    /// The member with the given remote id
    pub fn get(&self, remote_id: &str) -> Option<Arc<RemoteObject>> {
        self.members().get(remote_id).cloned()
    }

    /// Number of live members
    pub fn len(&self) -> usize {
        self.members().len()
    }

    /// True when no live member remains
    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    /// True once the whole group was released
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub(crate) fn add(&self, object: Arc<RemoteObject>) {
        self.members().insert(object.remote_id().to_string(), object);
    }

    /// Detach a member; returns true when the group became empty
    pub(crate) fn remove(&self, remote_id: &str) -> bool {
        let mut members = self.members();
        members.remove(remote_id);
        members.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<RemoteObject>> {
        self.members().values().cloned().collect()
    }

    /// Mark every member and the group itself released
    pub(crate) fn release_members(&self) {
        for (_, member) in self.members().drain() {
            member.mark_released();
        }
        self.mark_released();
    }

    pub(crate) fn mark_released(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
