use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::state::{HistoryEntry, PlayerState, STARTING_COINS};

pub const COINS_KEY: &str = "slot_coins";
pub const HISTORY_KEY: &str = "slot_history";
pub const WINS_KEY: &str = "slot_wins";

/// String key/value persistence, shaped like browser `localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&mut self, key: &str) -> StoreResult<()>;

    /// Writes every entry or none of them. The default writes one key at a
    /// time and puts earlier keys back if a later write fails.
    fn set_all(&mut self, entries: &[(&str, &str)]) -> StoreResult<()> {
        let mut previous: Vec<(&str, StoreResult<Option<String>>)> = Vec::with_capacity(entries.len());
        for &(key, value) in entries {
            let before = self.get(key);
            if let Err(e) = self.set(key, value) {
                for (key, before) in previous.into_iter().rev() {
                    let restored = match before {
                        Ok(Some(old)) => self.set(key, &old),
                        Ok(None) => self.remove(key),
                        Err(_) => continue,
                    };
                    if let Err(undo) = restored {
                        warn!(key, error = %undo, "could not roll back partial save");
                    }
                }
                return Err(e);
            }
            previous.push((key, before));
        }
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }

    fn set_all(&mut self, entries: &[(&str, &str)]) -> StoreResult<()> {
        (**self).set_all(entries)
    }
}

fn read_field<T>(store: &dyn KeyValueStore, key: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "unreadable stored field, using default");
            return None;
        }
    };
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(key, value = %raw, "malformed stored field, using default");
    }
    parsed
}

/// Loads the player state with the default starting balance.
pub fn load_player<S: KeyValueStore>(store: &S) -> PlayerState {
    load_or_start(store, STARTING_COINS)
}

/// Loads the player state. Never fails: every missing or malformed field
/// falls back to its own default, coins to `starting_coins`.
pub fn load_or_start<S: KeyValueStore>(store: &S, starting_coins: i64) -> PlayerState {
    let coins = read_field(store, COINS_KEY, |s| s.trim().parse::<i64>().ok()).unwrap_or(starting_coins);
    let history = read_field(store, HISTORY_KEY, |s| {
        serde_json::from_str::<Vec<HistoryEntry>>(s).ok()
    })
    .unwrap_or_default();
    let wins = read_field(store, WINS_KEY, |s| s.trim().parse::<u64>().ok()).unwrap_or(0);
    PlayerState { coins, history, wins }
}

/// Writes all three player keys in one `set_all`.
pub fn save_player<S: KeyValueStore>(store: &mut S, state: &PlayerState) -> StoreResult<()> {
    let coins = state.coins.to_string();
    let history = serde_json::to_string(&state.history)?;
    let wins = state.wins.to_string();
    store.set_all(&[
        (COINS_KEY, coins.as_str()),
        (HISTORY_KEY, history.as_str()),
        (WINS_KEY, wins.as_str()),
    ])
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of `set` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.writes += 1;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file, rewritten on every write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens `path`. A missing file starts empty; an unparsable one is
    /// ignored and overwritten on the next save.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "store file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };
        info!(path = %path.display(), keys = entries.len(), "opened json store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> StoreResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.set_all(&[(key, value)])
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        if let Some(old) = self.entries.remove(key) {
            if let Err(e) = self.flush() {
                self.entries.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    /// One file rewrite for the whole batch; on failure the in-memory copy
    /// goes back to what the file still holds.
    fn set_all(&mut self, entries: &[(&str, &str)]) -> StoreResult<()> {
        let before = self.entries.clone();
        for &(key, value) in entries {
            self.entries.insert(key.to_string(), value.to_string());
        }
        if let Err(e) = self.flush() {
            self.entries = before;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{HistoryEntry, Outcome};
    use chrono::Utc;

    fn sample_state() -> PlayerState {
        let mut state = PlayerState::with_coins(1140);
        state.wins = 3;
        for (i, outcome) in [Outcome::Loss, Outcome::Win, Outcome::Loss].into_iter().enumerate() {
            state.history.push(HistoryEntry {
                at: Utc::now(),
                outcome,
                coins: 990 + i as i64,
            });
        }
        state
    }

    #[test]
    fn empty_store_gives_defaults() {
        let store = MemoryStore::new();
        assert_eq!(load_player(&store), PlayerState::default());
        assert_eq!(load_or_start(&store, 250), PlayerState::with_coins(250));
    }

    #[test]
    fn memory_roundtrip() {
        let mut store = MemoryStore::new();
        let state = sample_state();
        save_player(&mut store, &state).unwrap();
        assert_eq!(load_player(&store), state);
        assert_eq!(store.writes(), 3);
    }

    #[test]
    fn corrupt_fields_fall_back_one_by_one() {
        let mut store = MemoryStore::new();
        store.insert(COINS_KEY, "lots");
        store.insert(HISTORY_KEY, "[not json");
        store.insert(WINS_KEY, "7");
        let state = load_player(&store);
        assert_eq!(state.coins, STARTING_COINS);
        assert!(state.history.is_empty());
        assert_eq!(state.wins, 7);

        let mut store = MemoryStore::new();
        store.insert(COINS_KEY, " 420 ");
        store.insert(WINS_KEY, "-1");
        let state = load_player(&store);
        assert_eq!(state.coins, 420);
        assert_eq!(state.wins, 0);
    }

    #[test]
    fn missing_coins_use_configured_start() {
        let mut store = MemoryStore::new();
        store.insert(WINS_KEY, "3");
        store.insert(HISTORY_KEY, "[]");
        let state = load_or_start(&store, 250);
        assert_eq!(state.coins, 250);
        assert_eq!(state.wins, 3);
    }

    /// Fails the `fail_at`-th call to `set`, counting from 1.
    struct FlakyStore {
        inner: MemoryStore,
        sets: usize,
        fail_at: usize,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
            self.sets += 1;
            if self.sets == self.fail_at {
                return Err(StoreError::Backend("disk full".into()));
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> StoreResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn failed_save_leaves_previous_player() {
        let before = sample_state();
        let mut store = FlakyStore {
            inner: MemoryStore::new(),
            sets: 0,
            fail_at: 5,
        };
        save_player(&mut store, &before).unwrap();

        let mut after = before.clone();
        after.coins -= 10;
        after.wins += 1;
        assert!(save_player(&mut store, &after).is_err());
        assert_eq!(load_player(&store), before);
    }

    #[test]
    fn failed_first_save_leaves_store_empty() {
        let mut store = FlakyStore {
            inner: MemoryStore::new(),
            sets: 0,
            fail_at: 3,
        };
        assert!(save_player(&mut store, &sample_state()).is_err());
        for key in [COINS_KEY, HISTORY_KEY, WINS_KEY] {
            assert_eq!(store.get(key).unwrap(), None);
        }
    }

    #[test]
    fn json_file_failed_save_keeps_last_player() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.json");
        let before = sample_state();
        let mut store = JsonFileStore::open(&path).unwrap();
        save_player(&mut store, &before).unwrap();

        // A directory where the file should be makes the next rename fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        let mut after = before.clone();
        after.coins = 5;
        assert!(save_player(&mut store, &after).is_err());
        assert_eq!(load_player(&store), before);
    }

    #[test]
    fn json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("player.json");
        let state = sample_state();
        {
            let mut store = JsonFileStore::open(&path).unwrap();
            save_player(&mut store, &state).unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(load_player(&store), state);
    }

    #[test]
    fn json_file_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.json");
        fs::write(&path, "{{{").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(load_player(&store), PlayerState::default());
    }
}
