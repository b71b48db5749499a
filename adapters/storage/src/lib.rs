#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Persistence for battle maps: saved documents, session identifiers and
//! single-line share strings.
//!
//! Documents are plain [`SceneSnapshot`] JSON files keyed by the slug of the
//! map name. Nothing is written implicitly; the editor saves and loads on
//! explicit request only.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

use battlemap_core::{slugify, SceneSnapshot};
use battlemap_system_peer_sync::{SessionId, SessionIdStore};

pub mod share;

const MAPS_DIRECTORY: &str = "maps";
const SESSIONS_FILE: &str = "sessions.json";
const DOCUMENT_EXTENSION: &str = "json";

/// Errors raised while reading or writing persisted data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The map name slugifies to nothing.
    #[error("map name `{0}` does not contain any usable characters")]
    InvalidName(String),
    /// The filesystem refused an operation.
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// A stored document could not be parsed or produced.
    #[error("document {} is not valid: {source}", .path.display())]
    Document {
        /// Path of the offending document.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Saved map documents keyed by map name.
pub trait MapStore {
    /// Writes the snapshot under the map name, replacing any previous save.
    fn save(&mut self, map_name: &str, snapshot: &SceneSnapshot) -> Result<(), StoreError>;

    /// Reads the snapshot saved under the map name.
    fn load(&self, map_name: &str) -> Result<Option<SceneSnapshot>, StoreError>;

    /// Keys of every saved map, sorted.
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// Map documents kept in memory, for tests and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryMapStore {
    maps: HashMap<String, SceneSnapshot>,
}

impl MapStore for MemoryMapStore {
    fn save(&mut self, map_name: &str, snapshot: &SceneSnapshot) -> Result<(), StoreError> {
        let key = map_key(map_name)?;
        let _ = self.maps.insert(key, snapshot.clone());
        Ok(())
    }

    fn load(&self, map_name: &str) -> Result<Option<SceneSnapshot>, StoreError> {
        let key = map_key(map_name)?;
        Ok(self.maps.get(&key).cloned())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.maps.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Map documents stored as JSON files below a root directory.
#[derive(Clone, Debug)]
pub struct FileMapStore {
    root: PathBuf,
}

impl FileMapStore {
    /// Creates a store rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Session identifier store sharing this store's root.
    #[must_use]
    pub fn session_ids(&self) -> FileSessionIds {
        FileSessionIds::new(self.root.join(SESSIONS_FILE))
    }

    fn maps_dir(&self) -> PathBuf {
        self.root.join(MAPS_DIRECTORY)
    }

    fn document_path(&self, map_name: &str) -> Result<PathBuf, StoreError> {
        let key = map_key(map_name)?;
        Ok(self
            .maps_dir()
            .join(format!("{key}.{DOCUMENT_EXTENSION}")))
    }
}

impl MapStore for FileMapStore {
    fn save(&mut self, map_name: &str, snapshot: &SceneSnapshot) -> Result<(), StoreError> {
        let path = self.document_path(map_name)?;
        let contents =
            serde_json::to_vec_pretty(snapshot).map_err(|source| StoreError::Document {
                path: path.clone(),
                source,
            })?;
        write_atomically(&path, &contents)?;
        tracing::info!(map = map_name, path = %path.display(), "saved map");
        Ok(())
    }

    fn load(&self, map_name: &str) -> Result<Option<SceneSnapshot>, StoreError> {
        let path = self.document_path(map_name)?;
        let Some(contents) = read_optional(&path)? else {
            return Ok(None);
        };
        let snapshot =
            serde_json::from_slice(&contents).map_err(|source| StoreError::Document {
                path: path.clone(),
                source,
            })?;
        tracing::info!(map = map_name, path = %path.display(), "loaded map");
        Ok(Some(snapshot))
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.maps_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Session identifiers persisted in a single JSON object keyed by map name.
#[derive(Clone, Debug)]
pub struct FileSessionIds {
    path: PathBuf,
}

impl FileSessionIds {
    /// Creates a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let Some(contents) = read_optional(&self.path)? else {
            return Ok(BTreeMap::new());
        };
        serde_json::from_slice(&contents).map_err(|source| StoreError::Document {
            path: self.path.clone(),
            source,
        })
    }
}

impl SessionIdStore for FileSessionIds {
    type Error = StoreError;

    fn load(&self, map_name: &str) -> Result<Option<SessionId>, Self::Error> {
        Ok(self.read_all()?.remove(map_name).map(SessionId::new))
    }

    fn save(&mut self, map_name: &str, id: &SessionId) -> Result<(), Self::Error> {
        let mut ids = self.read_all()?;
        let _ = ids.insert(map_name.to_owned(), id.as_str().to_owned());
        let contents = serde_json::to_vec_pretty(&ids).map_err(|source| StoreError::Document {
            path: self.path.clone(),
            source,
        })?;
        write_atomically(&self.path, &contents)
    }
}

fn map_key(map_name: &str) -> Result<String, StoreError> {
    let key = slugify(map_name);
    if key.is_empty() {
        return Err(StoreError::InvalidName(map_name.to_owned()));
    }
    Ok(key)
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, contents).map_err(io_error)?;
    fs::rename(&staging, path).map_err(io_error)
}
