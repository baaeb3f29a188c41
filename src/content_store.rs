//! The content store: typed whole-collection CRUD over a [`KeyValueBackend`].
//!
//! Every collection lives under one fixed key as a JSON array. Reads parse the
//! whole array; writes serialize the whole array back. There is no partial
//! update at the storage layer: "update one article" is read-all, replace by
//! id, write-all. Last writer wins.
//!
//! Reads never fail. A missing key or a value that does not parse is treated
//! as an empty collection (or the fallback document), and the difference
//! between "nothing stored" and "corrupt" is only visible through
//! [`Collection::state`] and the logs. `add`, `update` and `delete` are the
//! exception: if the backend itself cannot be read they fail instead of
//! writing a fresh array over rows they could not see.
//!
//! Every successful write is followed by [`Notifier::publish`] for the key,
//! so other mounted views re-read it.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::change_notifier::{ChangeHandler, LocalNotifier, Notifier, Subscription};
use crate::content_model::{Article, GalleryImage, NewsItem, Record, SectionDocument};
use crate::kv_backend::{KeyValueBackend, MemoryBackend};
use crate::lmdb_backend::LmdbBackend;
use crate::store_config::StoreConfig;
use crate::store_error::StoreError;

/// What is stored under a key, as far as the reader can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionState {
    Absent,
    /// Present but not parseable as the expected shape.
    Corrupt(String),
    /// Number of rows; 1 for a section document.
    Present(usize),
}

enum Loaded<V> {
    Absent,
    Corrupt(String),
    Present(V),
}

/// Time-ordered and collision-resistant, unlike a bare millisecond stamp.
pub fn new_record_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// RFC 3339 with milliseconds, matching what browsers produce for ISO dates.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone)]
pub struct ContentStore {
    backend: Arc<dyn KeyValueBackend>,
    notifier: Arc<dyn Notifier>,
}

impl ContentStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self { backend, notifier }
    }

    /// Non-durable store with a local notifier.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Arc::new(LocalNotifier::new()))
    }

    /// Durable store on LMDB as described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let backend = LmdbBackend::open(&config.directory, &config.name, config.quota_bytes)?;
        info!("Content store '{}' ready at {}", config.name, backend.path().display());
        Ok(Self::new(Arc::new(backend), Arc::new(LocalNotifier::new())))
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueBackend> {
        &self.backend
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn collection<T: Record>(&self) -> Collection<'_, T> {
        Collection {
            store: self,
            _record: PhantomData,
        }
    }

    pub fn articles(&self) -> Collection<'_, Article> {
        self.collection()
    }

    pub fn news(&self) -> Collection<'_, NewsItem> {
        self.collection()
    }

    pub fn gallery(&self) -> Collection<'_, GalleryImage> {
        self.collection()
    }

    /// Registers `handler` to run after every write to `key`.
    pub fn subscribe(&self, key: &str, handler: ChangeHandler) -> Subscription {
        self.notifier.subscribe(key, handler)
    }

    /// Section document under `D::KEY`, or its fallback content.
    pub fn load_document<D: SectionDocument>(&self) -> D {
        match self.load::<D>(D::KEY) {
            Loaded::Present(doc) => doc,
            Loaded::Absent => D::default(),
            Loaded::Corrupt(reason) => {
                warn!("Section '{}' is corrupt, showing fallback: {}", D::KEY, reason);
                D::default()
            }
        }
    }

    /// Replaces the whole section document.
    pub fn save_document<D: SectionDocument>(&self, document: &D) -> Result<(), StoreError> {
        self.write(D::KEY, document)
    }

    pub fn document_state<D: SectionDocument>(&self) -> CollectionState {
        match self.load::<D>(D::KEY) {
            Loaded::Absent => CollectionState::Absent,
            Loaded::Corrupt(reason) => CollectionState::Corrupt(reason),
            Loaded::Present(_) => CollectionState::Present(1),
        }
    }

    /// Raw string under `key`; backend failures read as absent.
    pub fn read_raw(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Reading '{}' failed, treating as absent: {}", key, e);
                None
            }
        }
    }

    pub fn write_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.backend.set(key, value)?;
        self.notifier.publish(key);
        Ok(())
    }

    pub fn remove_raw(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.backend.remove(key)?;
        if removed {
            self.notifier.publish(key);
        }
        Ok(removed)
    }

    fn load<V: DeserializeOwned>(&self, key: &str) -> Loaded<V> {
        match self.read_raw(key) {
            Some(raw) => parse(&raw),
            None => Loaded::Absent,
        }
    }

    /// Like `load`, but a backend that cannot be read is an error rather
    /// than an empty value. Read-modify-write paths go through here so an
    /// unreadable collection is never overwritten.
    fn load_for_write<V: DeserializeOwned>(&self, key: &str) -> Result<Loaded<V>, StoreError> {
        match self.backend.get(key)? {
            Some(raw) => Ok(parse(&raw)),
            None => Ok(Loaded::Absent),
        }
    }

    fn write<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        debug!("Writing '{}' ({} bytes)", key, json.len());
        self.backend
            .set(key, &json)
            .map_err(|e| e.for_write(key, json.len()))?;
        self.notifier.publish(key);
        Ok(())
    }
}

fn parse<V: DeserializeOwned>(raw: &str) -> Loaded<V> {
    match serde_json::from_str(raw) {
        Ok(value) => Loaded::Present(value),
        Err(e) => Loaded::Corrupt(e.to_string()),
    }
}

/// Typed view of one collection key.
pub struct Collection<'a, T: Record> {
    store: &'a ContentStore,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: Record> Collection<'a, T> {
    pub fn key(&self) -> &'static str {
        T::KEY
    }

    /// All rows in stored order; empty when absent or unparseable.
    pub fn list(&self) -> Vec<T> {
        match self.store.load::<Vec<T>>(T::KEY) {
            Loaded::Present(items) => items,
            Loaded::Absent => {
                debug!("Collection '{}' not stored yet", T::KEY);
                Vec::new()
            }
            Loaded::Corrupt(reason) => {
                warn!("Collection '{}' is corrupt, reading as empty: {}", T::KEY, reason);
                Vec::new()
            }
        }
    }

    /// Current rows for a read-modify-write. Corrupt content starts over
    /// empty like `list`; a failing backend read aborts the write.
    fn rows_for_write(&self) -> Result<Vec<T>, StoreError> {
        match self.store.load_for_write::<Vec<T>>(T::KEY) {
            Ok(Loaded::Present(items)) => Ok(items),
            Ok(Loaded::Absent) => Ok(Vec::new()),
            Ok(Loaded::Corrupt(reason)) => {
                warn!("Collection '{}' is corrupt, rewriting from empty: {}", T::KEY, reason);
                Ok(Vec::new())
            }
            Err(e) => {
                warn!("Reading '{}' before a write failed: {}", T::KEY, e);
                Err(e)
            }
        }
    }

    /// Rows satisfying `keep`, e.g. only published articles for the public page.
    pub fn list_where(&self, keep: impl Fn(&T) -> bool) -> Vec<T> {
        self.list().into_iter().filter(|item| keep(item)).collect()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.list().into_iter().find(|item| item.id() == id)
    }

    /// Appends a new row with a fresh id and creation timestamp.
    pub fn add(&self, draft: T::Draft) -> Result<T, StoreError> {
        let mut items = self.rows_for_write()?;
        let item = T::from_draft(new_record_id(), timestamp_now(), draft);
        items.push(item.clone());
        self.store.write(T::KEY, &items)?;
        info!("Added '{}' to '{}'", item.id(), T::KEY);
        Ok(item)
    }

    /// Shallow-merges `patch` into the first row with `id`.
    ///
    /// Returns `Ok(None)` without writing anything when no row matches.
    pub fn update(&self, id: &str, patch: T::Patch) -> Result<Option<T>, StoreError> {
        let mut items = self.rows_for_write()?;
        let updated = match items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                item.apply_patch(patch);
                item.clone()
            }
            None => {
                debug!("Update of '{}' in '{}': not found", id, T::KEY);
                return Ok(None);
            }
        };
        self.store.write(T::KEY, &items)?;
        info!("Updated '{}' in '{}'", id, T::KEY);
        Ok(Some(updated))
    }

    /// Removes every row with `id`; writes only if something was removed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut items = self.rows_for_write()?;
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() == before {
            debug!("Delete of '{}' in '{}': not found", id, T::KEY);
            return Ok(false);
        }
        self.store.write(T::KEY, &items)?;
        info!("Deleted '{}' from '{}'", id, T::KEY);
        Ok(true)
    }

    /// Overwrites the collection with exactly `items`.
    pub fn replace_all(&self, items: &[T]) -> Result<(), StoreError> {
        self.store.write(T::KEY, items)?;
        info!("Replaced '{}' with {} item(s)", T::KEY, items.len());
        Ok(())
    }

    /// Drops the key entirely. Returns whether anything was stored.
    pub fn clear(&self) -> Result<bool, StoreError> {
        self.store.remove_raw(T::KEY)
    }

    pub fn state(&self) -> CollectionState {
        match self.store.load::<Vec<T>>(T::KEY) {
            Loaded::Absent => CollectionState::Absent,
            Loaded::Corrupt(reason) => CollectionState::Corrupt(reason),
            Loaded::Present(items) => CollectionState::Present(items.len()),
        }
    }
}
