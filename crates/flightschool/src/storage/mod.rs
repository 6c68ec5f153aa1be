//! Storage layer for flightschool.
//!
//! Records are persisted as whole collections: each collection is one JSON
//! array stored under a fixed string key in a [`KeyValueStore`]. Every
//! mutating collection operation reads the array, changes it in memory, and
//! writes it back in a single `set`, so a failed operation leaves the stored
//! collection untouched.

pub mod availability;
pub mod lessons;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

pub use availability::AvailabilityStore;
pub use lessons::BookingStore;
pub use sqlite::{SqliteStore, StorageStats};

/// Key of the availability window collection.
pub const AVAILABILITY_KEY: &str = "instructor-availabilities";

/// Key of the scheduled lesson collection.
pub const LESSONS_KEY: &str = "scheduled-lessons";

/// Whole-value persistence keyed by string.
///
/// Implementations only need to get and replace opaque string values; they
/// know nothing about the records inside.
pub trait KeyValueStore: Debug {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// All keys currently holding a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn keys(&self) -> Result<Vec<String>>;
}

/// A process-local [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.values.borrow().keys().cloned().collect())
    }
}

/// A record that lives in a [`Collection`].
pub trait Record: Clone + Debug + Serialize + DeserializeOwned {
    /// Human-readable kind, used in not-found errors.
    const KIND: &'static str;

    /// The record's unique identifier.
    fn id(&self) -> &str;
}

/// A typed view over one JSON array in a [`KeyValueStore`].
#[derive(Debug)]
pub struct Collection<T> {
    backend: Rc<dyn KeyValueStore>,
    key: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Collection<T> {
    /// Create a view over `key` in `backend`.
    #[must_use]
    pub fn new(backend: Rc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            backend,
            key,
            _record: PhantomData,
        }
    }

    /// The key this collection is stored under.
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Read the whole collection. A missing key is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored JSON is malformed.
    pub fn load(&self) -> Result<Vec<T>> {
        match self.backend.get(self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the whole collection.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn save(&self, records: &[T]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.backend.set(self.key, &raw)?;
        debug!(key = self.key, records = records.len(), "Saved collection");
        Ok(())
    }

    /// Records matching `filter`, in stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded.
    pub fn list(&self, filter: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        Ok(self.load()?.into_iter().filter(|record| filter(record)).collect())
    }

    /// Look up a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded.
    pub fn find(&self, id: &str) -> Result<Option<T>> {
        Ok(self.load()?.into_iter().find(|record| record.id() == id))
    }

    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record has this id.
    pub fn get(&self, id: &str) -> Result<T> {
        self.find(id)?.ok_or_else(|| Error::not_found(T::KIND, id))
    }

    /// Append a new record.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the id is already taken.
    pub fn create(&self, record: T) -> Result<T> {
        let mut records = self.load()?;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(Error::validation(
                "id",
                format!("{} '{}' already exists", T::KIND, record.id()),
            ));
        }
        records.push(record.clone());
        self.save(&records)?;
        Ok(record)
    }

    /// Modify a record in place and persist the result.
    ///
    /// If `patch` fails, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or the error from `patch`.
    pub fn update(&self, id: &str, patch: impl FnOnce(&mut T) -> Result<()>) -> Result<T> {
        let mut records = self.load()?;
        let record = records
            .iter_mut()
            .find(|record| record.id() == id)
            .ok_or_else(|| Error::not_found(T::KIND, id))?;

        patch(record)?;
        if record.id() != id {
            return Err(Error::validation("id", "records cannot be renamed"));
        }
        let updated = record.clone();
        self.save(&records)?;
        Ok(updated)
    }

    /// Remove a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|record| record.id() != id);
        if records.len() == before {
            return Err(Error::not_found(T::KIND, id));
        }
        self.save(&records)
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded.
    pub fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }
}

/// Generate a fresh record id with the given prefix.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}
