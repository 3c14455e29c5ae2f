//! Cursors of table outputs that are published by id only.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::cursor::ResultSetCursor;
use crate::error::{Error, Result};
use crate::session::{ResultSetId, SessionId};

pub type SharedCursor = Arc<Mutex<ResultSetCursor>>;

/// Index from result-set id to a live cursor.
///
/// Entries are evicted when their session closes.
#[derive(Default)]
pub struct ResultSetCache {
    /// result set id -> (owning session, cursor)
    entries: RwLock<HashMap<ResultSetId, (SessionId, SharedCursor)>>,
}

impl ResultSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cursor. An existing entry with the same id is replaced.
    pub fn register(&self, id: ResultSetId, session: SessionId, cursor: SharedCursor) {
        let replaced = self.entries.write().insert(id, (session, cursor));
        if replaced.is_some() {
            tracing::debug!(result_set_id = id, "replaced cached result set");
        }
    }

    pub fn lookup(&self, id: ResultSetId) -> Option<SharedCursor> {
        self.entries
            .read()
            .get(&id)
            .map(|(_, cursor)| Arc::clone(cursor))
    }

    pub fn get(&self, id: ResultSetId) -> Result<SharedCursor> {
        self.lookup(id).ok_or(Error::CacheMiss(id))
    }

    /// Drop every entry owned by `session`. Returns the number of entries removed.
    pub fn evict_all(&self, session: SessionId) -> usize {
        let evicted: Vec<SharedCursor> = {
            let mut entries = self.entries.write();
            let ids: Vec<ResultSetId> = entries
                .iter()
                .filter(|(_, (owner, _))| *owner == session)
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| entries.remove(id))
                .map(|(_, cursor)| cursor)
                .collect()
        };
        let count = evicted.len();
        if count > 0 {
            tracing::debug!(session, count, "evicted cached result sets");
        }
        // cursors close on drop, outside the lock
        drop(evicted);
        count
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
