use slotgrid_core::{KeyValueStore, StoreError, StoreResult};
use web_sys::Storage;

/// The page's `localStorage`. Without one (private mode, no window) reads
/// come back empty and writes fail, so the game still plays.
pub struct LocalStorage {
    storage: Option<Storage>,
}

impl LocalStorage {
    pub fn open() -> Self {
        let storage = web_sys::window().and_then(|win| win.local_storage().ok().flatten());
        if storage.is_none() {
            tracing::warn!("localStorage unavailable, progress will not be saved");
        }
        Self { storage }
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match &self.storage {
            Some(store) => store
                .get_item(key)
                .map_err(|e| StoreError::Backend(format!("{e:?}"))),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        match &self.storage {
            Some(store) => store
                .set_item(key, value)
                .map_err(|e| StoreError::Backend(format!("{e:?}"))),
            None => Err(StoreError::Backend("localStorage unavailable".into())),
        }
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        match &self.storage {
            Some(store) => store
                .remove_item(key)
                .map_err(|e| StoreError::Backend(format!("{e:?}"))),
            None => Ok(()),
        }
    }
}
