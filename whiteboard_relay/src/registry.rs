use std::collections::HashMap;

use crate::{
    connection::{ConnectionHandle, ConnectionId},
    error::Closed,
};

/// Live connections that receive broadcasts, keyed by connection id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, ConnectionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a handle with the same id is already registered.
    pub fn add(&mut self, handle: ConnectionHandle) -> bool {
        if self.sessions.contains_key(handle.id()) {
            return false;
        }
        self.sessions.insert(handle.id().to_owned(), handle);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<ConnectionHandle> {
        self.sessions.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Call `f` on every handle except `except`.
    ///
    /// A member reporting [`Closed`] does not stop the pass. The ids of those
    /// members are returned so the caller can remove them once iteration is
    /// over.
    pub fn for_each_except<F>(&self, except: &str, mut f: F) -> Vec<ConnectionId>
    where
        F: FnMut(&ConnectionHandle) -> Result<(), Closed>,
    {
        let mut dead = Vec::new();
        for (id, handle) in &self.sessions {
            if id == except {
                continue;
            }
            if f(handle).is_err() {
                dead.push(id.clone());
            }
        }
        dead
    }
}
