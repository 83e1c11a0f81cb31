//! Persistence adapter.
//!
//! Reads go to the hosted table store first and fall back to the local
//! key-value store; writes land locally first and are then pushed. Callers
//! always get data back, and every write reports how far it got.

pub mod local;
pub mod records;
pub mod remote;

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::config::Config;
use crate::models::{AlterEgo, Chat, DecisionEntry, NoteCategory, StickyNote, Task};
use crate::utils;

pub use local::LocalStore;
pub use records::Record;
pub use remote::{MemoryRemote, RemoteBackend, SupabaseBackend};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to create data directory: {0}")]
    DirectoryError(String),
    #[error("Malformed data under '{key}': {reason}")]
    Malformed { key: String, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote store rejected request on '{table}' ({status}): {body}")]
    Remote {
        table: String,
        status: u16,
        body: String,
    },
    #[error("Invalid row in '{table}': {reason}")]
    InvalidRow { table: &'static str, reason: String },
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("Remote store is not configured")]
    NotConfigured,
}

/// How far a write got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Stored locally and accepted by the remote
    Remote,
    /// Stored locally only; the remote is absent or failed
    LocalOnly,
    /// Stored locally; a remote push is queued
    Pending,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncState::Remote => "synced",
            SyncState::LocalOnly => "saved locally",
            SyncState::Pending => "sync pending",
        })
    }
}

/// A written record together with its sync state
#[derive(Debug, Clone, PartialEq)]
pub struct Saved<R> {
    pub record: R,
    pub sync: SyncState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pushed: usize,
    pub failed: usize,
}

impl SyncReport {
    fn merge(&mut self, other: SyncReport) {
        self.pushed += other.pushed;
        self.failed += other.failed;
    }
}

pub struct Persistence {
    local: LocalStore,
    remote: Option<Box<dyn RemoteBackend>>,
    user_id: String,
    seed_samples: bool,
}

impl Persistence {
    pub fn new(local: LocalStore, remote: Option<Box<dyn RemoteBackend>>, user_id: impl Into<String>) -> Self {
        Self {
            local,
            remote,
            user_id: user_id.into(),
            seed_samples: true,
        }
    }

    pub fn local_only(local: LocalStore, user_id: impl Into<String>) -> Self {
        Self::new(local, None, user_id)
    }

    /// Whether empty or unreadable collections are filled with sample records
    pub fn with_seeding(mut self, seed_samples: bool) -> Self {
        self.seed_samples = seed_samples;
        self
    }

    /// Open the local store at the configured path and attach the remote when
    /// credentials are present. A remote that cannot be built is logged and
    /// skipped.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let local = LocalStore::open(&config.get_database_path())?;
        let remote: Option<Box<dyn RemoteBackend>> = if config.remote.is_configured() {
            match SupabaseBackend::new(&config.remote) {
                Ok(backend) => Some(Box::new(backend)),
                Err(e) => {
                    tracing::warn!(error = %e, "remote store unavailable, using local storage only");
                    None
                }
            }
        } else {
            None
        };
        tracing::info!(remote = remote.is_some(), "persistence ready");
        Ok(Self::new(local, remote, config.user_id.clone()).with_seeding(config.seed_samples))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// All records of a collection. The remote is consulted first and its
    /// answer refreshes the local cache; any remote failure falls back to the
    /// local copy. Local writes the remote has not confirmed are replayed
    /// before the read and win over the remote rows.
    pub fn list<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        if let Some(remote) = &self.remote {
            self.replay_pending::<R>(remote.as_ref());
            match self.fetch_remote::<R>(remote.as_ref()) {
                Ok(records) => {
                    let records = self.merge_pending(records)?;
                    if let Err(e) = self.local.store(&records) {
                        tracing::warn!(kind = R::KIND, error = %e, "failed to refresh local cache");
                    }
                    return Ok(records);
                }
                Err(e) => {
                    tracing::warn!(kind = R::KIND, error = %e, "remote read failed, using local data");
                }
            }
        }
        self.load_local()
    }

    pub fn find<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        Ok(self.list::<R>()?.into_iter().find(|r| r.id() == id))
    }

    /// Write locally, then push. Fails only when the local write fails and
    /// the remote did not take the record either.
    pub fn save<R: Record>(&self, record: R) -> Result<Saved<R>, StoreError> {
        let local = self.write_local(&record);
        if let Err(e) = &local {
            tracing::warn!(kind = R::KIND, id = record.id(), error = %e, "local write failed");
        }
        let sync = match &self.remote {
            None => {
                local?;
                self.mark_unsynced::<R>(record.id())?;
                SyncState::LocalOnly
            }
            Some(remote) => match self.upsert_remote(remote.as_ref(), &record) {
                Ok(()) => {
                    if local.is_ok() {
                        self.clear_unsynced::<R>(record.id());
                    }
                    SyncState::Remote
                }
                Err(e) => {
                    local?;
                    tracing::warn!(kind = R::KIND, id = record.id(), error = %e, "remote write failed, kept locally");
                    self.mark_unsynced::<R>(record.id())?;
                    SyncState::LocalOnly
                }
            },
        };
        Ok(Saved { record, sync })
    }

    /// Write locally only; a later [`Persistence::push`] sends it upstream
    pub fn save_local<R: Record>(&self, record: R) -> Result<Saved<R>, StoreError> {
        self.write_local(&record)?;
        self.mark_unsynced::<R>(record.id())?;
        let sync = if self.remote.is_some() {
            SyncState::Pending
        } else {
            SyncState::LocalOnly
        };
        Ok(Saved { record, sync })
    }

    /// Push one record to the remote without touching the local copy
    pub fn push<R: Record>(&self, record: &R) -> SyncState {
        let Some(remote) = &self.remote else {
            return SyncState::LocalOnly;
        };
        match self.upsert_remote(remote.as_ref(), record) {
            Ok(()) => {
                tracing::debug!(kind = R::KIND, id = record.id(), "pushed");
                self.clear_unsynced::<R>(record.id());
                SyncState::Remote
            }
            Err(e) => {
                tracing::warn!(kind = R::KIND, id = record.id(), error = %e, "push failed");
                SyncState::LocalOnly
            }
        }
    }

    /// Remove a record everywhere; returns whether any copy existed. A delete
    /// the remote did not confirm is remembered and retried.
    pub fn delete<R: Record>(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.load_local::<R>()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        let removed_locally = records.len() != before;
        if removed_locally {
            self.local.store(&records)?;
        }
        self.clear_unsynced::<R>(id);

        let removed_remotely = match &self.remote {
            Some(remote) => match remote.delete(R::TABLE, &self.user_id, id) {
                Ok(removed) => removed,
                Err(e) => {
                    tracing::warn!(kind = R::KIND, id, error = %e, "remote delete failed, will retry");
                    self.update_ids(&Self::deleted_key::<R>(), |ids| {
                        ids.insert(id.to_string());
                    })?;
                    false
                }
            },
            None => false,
        };
        Ok(removed_locally || removed_remotely)
    }

    /// Replay pending deletes and push every locally stored record
    pub fn sync_all(&self) -> Result<SyncReport, StoreError> {
        if self.remote.is_none() {
            return Err(StoreError::NotConfigured);
        }
        let mut report = SyncReport::default();
        report.merge(self.sync_collection::<Task>()?);
        report.merge(self.sync_collection::<NoteCategory>()?);
        report.merge(self.sync_collection::<StickyNote>()?);
        report.merge(self.sync_collection::<DecisionEntry>()?);
        report.merge(self.sync_collection::<AlterEgo>()?);
        report.merge(self.sync_collection::<Chat>()?);
        tracing::info!(pushed = report.pushed, failed = report.failed, "sync finished");
        Ok(report)
    }

    fn sync_collection<R: Record>(&self) -> Result<SyncReport, StoreError> {
        let mut report = SyncReport::default();
        if let Some(remote) = &self.remote {
            report.failed += self.replay_deletes::<R>(remote.as_ref());
        }
        for record in self.load_local::<R>()? {
            match self.push(&record) {
                SyncState::Remote => report.pushed += 1,
                _ => report.failed += 1,
            }
        }
        Ok(report)
    }

    fn unsynced_key<R: Record>() -> String {
        format!("{}.unsynced", R::COLLECTION)
    }

    fn deleted_key<R: Record>() -> String {
        format!("{}.deleted", R::COLLECTION)
    }

    fn update_ids<F>(&self, key: &str, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeSet<String>),
    {
        let mut ids = self.pending_ids(key);
        change(&mut ids);
        self.local.store_ids(key, &ids)
    }

    /// Pending id set; an unreadable set is logged and treated as empty
    fn pending_ids(&self, key: &str) -> BTreeSet<String> {
        match self.local.load_ids(key) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(%key, error = %e, "discarding unreadable sync state");
                BTreeSet::new()
            }
        }
    }

    fn mark_unsynced<R: Record>(&self, id: &str) -> Result<(), StoreError> {
        self.update_ids(&Self::unsynced_key::<R>(), |ids| {
            ids.insert(id.to_string());
        })
    }

    fn clear_unsynced<R: Record>(&self, id: &str) {
        let key = Self::unsynced_key::<R>();
        if !self.pending_ids(&key).contains(id) {
            return;
        }
        if let Err(e) = self.update_ids(&key, |ids| {
            ids.remove(id);
        }) {
            tracing::warn!(kind = R::KIND, id, error = %e, "failed to record sync");
        }
    }

    /// Retry deletes the remote missed; returns how many still failed
    fn replay_deletes<R: Record>(&self, remote: &dyn RemoteBackend) -> usize {
        let key = Self::deleted_key::<R>();
        let pending = self.pending_ids(&key);
        if pending.is_empty() {
            return 0;
        }
        let mut remaining = BTreeSet::new();
        for id in pending {
            if let Err(e) = remote.delete(R::TABLE, &self.user_id, &id) {
                tracing::debug!(kind = R::KIND, %id, error = %e, "delete still pending");
                remaining.insert(id);
            }
        }
        let failed = remaining.len();
        if let Err(e) = self.local.store_ids(&key, &remaining) {
            tracing::warn!(kind = R::KIND, error = %e, "failed to record replayed deletes");
        }
        failed
    }

    /// Send pending deletes and unconfirmed writes before a remote read
    fn replay_pending<R: Record>(&self, remote: &dyn RemoteBackend) {
        self.replay_deletes::<R>(remote);
        let unsynced = self.pending_ids(&Self::unsynced_key::<R>());
        if unsynced.is_empty() {
            return;
        }
        let records = match self.local.load::<R>() {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(kind = R::KIND, error = %e, "cannot replay unreadable local data");
                return;
            }
        };
        for record in records.iter().filter(|r| unsynced.contains(r.id())) {
            self.push(record);
        }
    }

    /// Remote rows with pending deletes dropped and unconfirmed local
    /// records laid over them
    fn merge_pending<R: Record>(&self, mut records: Vec<R>) -> Result<Vec<R>, StoreError> {
        let deleted = self.pending_ids(&Self::deleted_key::<R>());
        records.retain(|r| !deleted.contains(r.id()));

        let unsynced = self.pending_ids(&Self::unsynced_key::<R>());
        if unsynced.is_empty() {
            return Ok(records);
        }
        let local = match self.local.load::<R>() {
            Ok(local) => local.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(kind = R::KIND, error = %e, "local data unreadable, using remote rows");
                return Ok(records);
            }
        };
        for record in local.into_iter().filter(|r| unsynced.contains(r.id())) {
            match records.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        }
        Ok(records)
    }

    fn fetch_remote<R: Record>(&self, remote: &dyn RemoteBackend) -> Result<Vec<R>, StoreError> {
        let rows = remote.select(R::TABLE, &self.user_id)?;
        let mut records = Vec::with_capacity(rows.len());
        for value in rows {
            let parsed = serde_json::from_value::<R::Row>(value)
                .map_err(StoreError::from)
                .and_then(R::from_row);
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(table = R::TABLE, error = %e, "skipping invalid remote row"),
            }
        }
        Ok(records)
    }

    fn upsert_remote<R: Record>(&self, remote: &dyn RemoteBackend, record: &R) -> Result<(), StoreError> {
        let row = serde_json::to_value(record.to_row(&self.user_id))?;
        remote.upsert(R::TABLE, row)?;
        Ok(())
    }

    /// Local collection, seeding it on first use or when it cannot be read
    fn load_local<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        match self.local.load::<R>() {
            Ok(Some(records)) => Ok(records),
            Ok(None) => self.seed(),
            Err(StoreError::Malformed { key, reason }) => {
                tracing::warn!(%key, %reason, "discarding malformed local data");
                self.seed()
            }
            Err(e) => Err(e),
        }
    }

    fn seed<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        let records = if self.seed_samples {
            R::samples(utils::today())
        } else {
            Vec::new()
        };
        if !records.is_empty() {
            tracing::info!(kind = R::KIND, count = records.len(), "seeding sample data");
        }
        self.local.store(&records)?;
        Ok(records)
    }

    fn write_local<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let mut records = self.load_local::<R>()?;
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.local.store(&records)
    }

    // Tasks

    pub fn get_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.list()
    }

    pub fn save_task(&self, task: Task) -> Result<Saved<Task>, StoreError> {
        self.save(task)
    }

    pub fn delete_task(&self, id: &str) -> Result<bool, StoreError> {
        self.delete::<Task>(id)
    }

    // Sticky notes

    pub fn get_notes(&self) -> Result<Vec<StickyNote>, StoreError> {
        let mut notes = self.list::<StickyNote>()?;
        notes.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| a.position.cmp(&b.position))
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        Ok(notes)
    }

    pub fn save_note(&self, mut note: StickyNote) -> Result<Saved<StickyNote>, StoreError> {
        note.touch();
        self.save(note)
    }

    pub fn delete_note(&self, id: &str) -> Result<bool, StoreError> {
        self.delete::<StickyNote>(id)
    }

    pub fn get_note_categories(&self) -> Result<Vec<NoteCategory>, StoreError> {
        self.list()
    }

    pub fn save_note_category(&self, category: NoteCategory) -> Result<Saved<NoteCategory>, StoreError> {
        self.save(category)
    }

    /// Delete a category and detach it from every note that used it
    pub fn delete_note_category(&self, id: &str) -> Result<bool, StoreError> {
        for mut note in self.list::<StickyNote>()? {
            if note.category_id.as_deref() == Some(id) {
                note.category_id = None;
                self.save_note(note)?;
            }
        }
        self.delete::<NoteCategory>(id)
    }

    // Decisions

    pub fn get_decisions(&self) -> Result<Vec<DecisionEntry>, StoreError> {
        self.list()
    }

    pub fn save_decision(&self, mut entry: DecisionEntry) -> Result<Saved<DecisionEntry>, StoreError> {
        entry.updated_at = crate::models::now();
        self.save(entry)
    }

    pub fn delete_decision(&self, id: &str) -> Result<bool, StoreError> {
        self.delete::<DecisionEntry>(id)
    }

    // Alter egos and chats

    pub fn get_alter_egos(&self) -> Result<Vec<AlterEgo>, StoreError> {
        let mut egos = self.list::<AlterEgo>()?;
        egos.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(egos)
    }

    pub fn save_alter_ego(&self, mut ego: AlterEgo) -> Result<Saved<AlterEgo>, StoreError> {
        ego.updated_at = crate::models::now();
        self.save(ego)
    }

    /// Delete an alter ego together with its chats
    pub fn delete_alter_ego(&self, id: &str) -> Result<bool, StoreError> {
        for chat in self.get_chats_for(id)? {
            self.delete::<Chat>(&chat.id)?;
        }
        self.delete::<AlterEgo>(id)
    }

    pub fn get_chats(&self) -> Result<Vec<Chat>, StoreError> {
        self.list()
    }

    /// Chats with one alter ego, most recently active first
    pub fn get_chats_for(&self, alter_ego_id: &str) -> Result<Vec<Chat>, StoreError> {
        let mut chats: Vec<Chat> = self
            .list::<Chat>()?
            .into_iter()
            .filter(|c| c.alter_ego_id == alter_ego_id)
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    pub fn save_chat(&self, chat: Chat) -> Result<Saved<Chat>, StoreError> {
        self.save(chat)
    }

    pub fn delete_chat(&self, id: &str) -> Result<bool, StoreError> {
        self.delete::<Chat>(id)
    }
}
