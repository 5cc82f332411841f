//! Change tracking for a unit of work.

use indexmap::IndexMap;
use serde_json::Value;

use repokit_core::storage::{Change, ChangeKind, EntityEntry, EntityState};

#[derive(Debug, Clone)]
struct Tracked {
    state: EntityState,
    body: Value,
}

/// Tracks entity states between loads and commits.
///
/// Entries are keyed by `(table, key)` and kept in the order they were
/// first tracked, which is also the order changes are committed in.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: IndexMap<(String, String), Tracked>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn id(table: &str, key: &str) -> (String, String) {
        (table.to_string(), key.to_string())
    }

    /// Records a loaded row as `Unchanged` unless it is already tracked.
    pub fn attach(&mut self, table: &str, key: &str, body: Value) {
        self.entries
            .entry(Self::id(table, key))
            .or_insert(Tracked {
                state: EntityState::Unchanged,
                body,
            });
    }

    /// Stages an insert.
    pub fn add(&mut self, table: &str, key: &str, body: Value) -> EntityState {
        let state = match self.state(table, key) {
            // Re-adding something staged for deletion turns it into an update
            EntityState::Deleted => EntityState::Modified,
            _ => EntityState::Added,
        };
        self.entries
            .insert(Self::id(table, key), Tracked { state, body });
        state
    }

    /// Stages an update. Entities staged for insert stay `Added`.
    pub fn update(&mut self, table: &str, key: &str, body: Value) -> EntityState {
        let state = match self.state(table, key) {
            EntityState::Added => EntityState::Added,
            _ => EntityState::Modified,
        };
        self.entries
            .insert(Self::id(table, key), Tracked { state, body });
        state
    }

    /// Stages a delete. Entities staged for insert are detached instead.
    pub fn remove(&mut self, table: &str, key: &str) -> EntityState {
        let id = Self::id(table, key);
        if self.state(table, key) == EntityState::Added {
            self.entries.shift_remove(&id);
            return EntityState::Detached;
        }
        self.entries
            .entry(id)
            .and_modify(|tracked| tracked.state = EntityState::Deleted)
            .or_insert(Tracked {
                state: EntityState::Deleted,
                body: Value::Null,
            });
        EntityState::Deleted
    }

    /// Current state of an entity; `Detached` when it is not tracked.
    pub fn state(&self, table: &str, key: &str) -> EntityState {
        self.entries
            .get(&Self::id(table, key))
            .map_or(EntityState::Detached, |tracked| tracked.state)
    }

    pub fn entries(&self) -> Vec<EntityEntry> {
        self.entries
            .iter()
            .map(|((table, key), tracked)| EntityEntry {
                table: table.clone(),
                key: key.clone(),
                state: tracked.state,
            })
            .collect()
    }

    /// Stops tracking everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn has_changes(&self) -> bool {
        self.entries.values().any(|tracked| {
            matches!(
                tracked.state,
                EntityState::Added | EntityState::Modified | EntityState::Deleted
            )
        })
    }

    /// Staged writes, in tracking order.
    pub fn pending_changes(&self) -> Vec<Change> {
        self.entries
            .iter()
            .filter_map(|((table, key), tracked)| {
                let kind = match tracked.state {
                    EntityState::Added => ChangeKind::Insert(tracked.body.clone()),
                    EntityState::Modified => ChangeKind::Update(tracked.body.clone()),
                    EntityState::Deleted => ChangeKind::Delete,
                    EntityState::Unchanged | EntityState::Detached => return None,
                };
                Some(Change {
                    table: table.clone(),
                    key: key.clone(),
                    kind,
                })
            })
            .collect()
    }

    /// Marks staged writes as persisted: inserts and updates become
    /// `Unchanged`, deletes stop being tracked.
    pub fn accept_changes(&mut self) {
        self.entries
            .retain(|_, tracked| tracked.state != EntityState::Deleted);
        for tracked in self.entries.values_mut() {
            tracked.state = EntityState::Unchanged;
        }
    }
}
