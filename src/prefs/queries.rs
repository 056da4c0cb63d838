use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{PrefStore, PrefsError, Result};
use crate::catalog::PlayMode;
use crate::filter::FilterSpec;
use crate::sort::SortSpec;
use crate::store::{CatalogState, ColumnVisibility, Store, Stores};

pub const PLAYMODE_KEY: &str = "playmode";
pub const COLUMNS_KEY: &str = "columns";
pub const FILTERS_KEY: &str = "filters";
pub const SORT_KEY: &str = "sort";

pub const ALL_KEYS: [&str; 4] = [PLAYMODE_KEY, COLUMNS_KEY, FILTERS_KEY, SORT_KEY];

/// Everything persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub play_mode: PlayMode,
    pub columns: ColumnVisibility,
    pub filters: FilterSpec,
    pub sort: SortSpec,
}

impl Preferences {
    pub fn from_stores(stores: &Stores) -> Self {
        Self {
            play_mode: stores.catalog.get().play_mode,
            columns: stores.columns.get().clone(),
            filters: stores.filter.get().clone(),
            sort: stores.sort.get().clone(),
        }
    }

    /// Fresh session stores starting from these preferences, with no records loaded.
    pub fn into_stores(self) -> Stores {
        let catalog = CatalogState { play_mode: self.play_mode, ..CatalogState::default() };
        Stores {
            catalog: Store::new(catalog),
            filter: Store::new(self.filters),
            sort: Store::new(self.sort),
            columns: Store::new(self.columns),
        }
    }
}

impl PrefStore {
    /// Raw JSON blob stored under `key`.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// Decode the blob under `key`. Missing or corrupt blobs give `T::default()`.
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("Stored preference '{key}' is unreadable ({e}), using default");
                Ok(T::default())
            }
        }
    }

    pub fn save<T: Serialize>(&self, key: &'static str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|source| PrefsError::Encode { key, source })?;
        self.set_raw(key, &json)
    }

    pub fn load_all(&self) -> Result<Preferences> {
        Ok(Preferences {
            play_mode: self.load(PLAYMODE_KEY)?,
            columns: self.load(COLUMNS_KEY)?,
            filters: self.load(FILTERS_KEY)?,
            sort: self.load(SORT_KEY)?,
        })
    }

    pub fn save_all(&self, prefs: &Preferences) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.save(PLAYMODE_KEY, &prefs.play_mode)?;
        self.save(COLUMNS_KEY, &prefs.columns)?;
        self.save(FILTERS_KEY, &prefs.filters)?;
        self.save(SORT_KEY, &prefs.sort)?;
        tx.commit()?;
        log::debug!("Saved preferences");
        Ok(())
    }

    /// Delete every stored preference. Returns the number of keys removed.
    pub fn reset(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM preferences", [])?;
        log::info!("Cleared {removed} stored preferences");
        Ok(removed)
    }

    /// Stored keys with their last update time, for display.
    pub fn entries(&self) -> Result<Vec<(String, String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM preferences ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
