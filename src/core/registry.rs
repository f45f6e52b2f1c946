//! Registry of live client connections
//!
//! The registry owns every `Connection` from transport connect until
//! disconnect or delivery failure. Broadcasts iterate a point-in-time
//! snapshot, so the map can keep changing while sends are in flight.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::connection::{Connection, ConnectionHandle};
use crate::error::{HubError, Result};

pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionHandle>,
    next_seq: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register a new live connection
    pub fn register(&self, mut connection: Connection) -> Result<ConnectionHandle> {
        match self.connections.entry(connection.id.clone()) {
            Entry::Occupied(_) => {
                error!("Refusing to register duplicate connection id {}", connection.id);
                Err(HubError::DuplicateId(connection.id))
            }
            Entry::Vacant(slot) => {
                connection.seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                let handle = Arc::new(connection);
                slot.insert(handle.clone());
                debug!("Registered connection {} from {}", handle.id, handle.source_key);
                Ok(handle)
            }
        }
    }

    /// Remove a connection. Unknown ids are ignored; returns whether anything was removed.
    pub fn unregister(&self, id: &str) -> bool {
        match self.connections.remove(id) {
            Some((_, handle)) => {
                handle.close();
                debug!("Unregistered connection {}", id);
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of the live connections, in registration order
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<ConnectionHandle> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        handles.sort_by_key(|handle| handle.seq);
        handles
    }

    pub fn get(&self, id: &str) -> Option<ConnectionHandle> {
        self.connections.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
