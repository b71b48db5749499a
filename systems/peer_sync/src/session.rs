use std::{collections::HashMap, convert::Infallible, error::Error};

use rand::Rng;

use crate::SessionId;

/// Persists one session identifier per map name.
pub trait SessionIdStore {
    /// Failure raised by the backing storage.
    type Error: Error;

    /// Loads the identifier previously stored for the map.
    fn load(&self, map_name: &str) -> Result<Option<SessionId>, Self::Error>;

    /// Stores the identifier for the map.
    fn save(&mut self, map_name: &str, id: &SessionId) -> Result<(), Self::Error>;
}

/// Returns the stable identifier for `map_name`, generating and storing one
/// on first use. Storage failures are logged and a fresh identifier is used.
pub fn session_id_for<S, R>(map_name: &str, store: &mut S, rng: &mut R) -> SessionId
where
    S: SessionIdStore + ?Sized,
    R: Rng + ?Sized,
{
    match store.load(map_name) {
        Ok(Some(id)) => return id,
        Ok(None) => {}
        Err(error) => {
            tracing::warn!(map = map_name, error = %error, "failed to load session id");
        }
    }
    let id = SessionId::generate(map_name, rng);
    if let Err(error) = store.save(map_name, &id) {
        tracing::warn!(map = map_name, error = %error, "failed to persist session id");
    }
    id
}

/// Session identifiers kept in memory only.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionIds {
    ids: HashMap<String, SessionId>,
}

impl SessionIdStore for MemorySessionIds {
    type Error = Infallible;

    fn load(&self, map_name: &str) -> Result<Option<SessionId>, Self::Error> {
        Ok(self.ids.get(map_name).cloned())
    }

    fn save(&mut self, map_name: &str, id: &SessionId) -> Result<(), Self::Error> {
        let _ = self.ids.insert(map_name.to_owned(), id.clone());
        Ok(())
    }
}
