use super::{decode_session, encode_session, ClickEvent, ClickState, Overlay, PlayerState, Session};
use crate::config::Config;
use crate::host::{GeometrySink, KeyValueStore};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const SHARD_COUNT: usize = 16;

type Shard = Mutex<FxHashMap<Uuid, Arc<PlayerState>>>;

/// Concurrent UUID → [`PlayerState`] registry backed by a key-value store.
///
/// Each shard's lock covers both check-and-create and check-and-erase, so a
/// player is constructed (and loaded from the store) at most once, and a
/// release never races a creation for the same key.
pub struct PlayerStateManager {
    shards: Vec<Shard>,
    store: Arc<dyn KeyValueStore>,
    config: Arc<Config>,
    geometry: Option<Arc<dyn GeometrySink>>,
}

impl PlayerStateManager {
    pub fn new(store: Arc<dyn KeyValueStore>, config: Arc<Config>) -> Self {
        PlayerStateManager {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(FxHashMap::default())).collect(),
            store,
            config,
            geometry: None,
        }
    }

    /// Sessions created from now on draw their selection into `sink`.
    pub fn with_geometry(mut self, sink: Arc<dyn GeometrySink>) -> Self {
        self.geometry = Some(sink);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn shard(&self, uuid: &Uuid) -> MutexGuard<'_, FxHashMap<Uuid, Arc<PlayerState>>> {
        let (hi, lo) = uuid.as_u64_pair();
        let index = ((hi ^ lo) % SHARD_COUNT as u64) as usize;
        self.shards[index].lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key(uuid: &Uuid) -> String {
        uuid.hyphenated().to_string()
    }

    fn attach(&self, session: &mut Session) {
        if let Some(sink) = &self.geometry {
            session.set_overlay(Some(Overlay {
                sink: sink.clone(),
                colors: self.config.colors.clone(),
            }));
        }
    }

    /// Persisted session for `uuid`. A corrupt blob is logged and treated as
    /// absent.
    fn load(&self, uuid: &Uuid) -> Option<Session> {
        let bytes = self.store.get(&Self::key(uuid))?;
        match decode_session(&bytes, &self.config.player_default_config) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(%uuid, error = %e, "discarding corrupt player state");
                None
            }
        }
    }

    fn save(&self, state: &PlayerState) -> bool {
        let mut session = state.lock();
        match encode_session(&session) {
            Ok(bytes) => {
                let saved = self.store.set(&Self::key(&state.uuid()), &bytes);
                if saved {
                    session.mark_clean();
                }
                saved
            }
            Err(e) => {
                tracing::warn!(uuid = %state.uuid(), error = %e, "failed to encode player state");
                false
            }
        }
    }

    /// Live state, or for persistent players a detached copy loaded from the
    /// store. Never inserts.
    pub fn get(&self, uuid: Uuid, temp: bool) -> Option<Arc<PlayerState>> {
        if let Some(state) = self.shard(&uuid).get(&uuid) {
            return Some(state.clone());
        }
        if temp {
            return None;
        }
        let mut session = self.load(&uuid)?;
        self.attach(&mut session);
        Some(Arc::new(PlayerState::new(uuid, false, session)))
    }

    /// Live state for `uuid`, created on first use. Persistent players are
    /// loaded from the store inside the shard lock.
    pub fn get_or_create(&self, uuid: Uuid, temp: bool) -> Arc<PlayerState> {
        let mut shard = self.shard(&uuid);
        if let Some(state) = shard.get(&uuid) {
            return state.clone();
        }
        let loaded = if temp { None } else { self.load(&uuid) };
        let restored = loaded.is_some();
        let mut session =
            loaded.unwrap_or_else(|| Session::new(self.config.player_default_config.clone()));
        self.attach(&mut session);
        let state = Arc::new(PlayerState::new(uuid, temp, session));
        shard.insert(uuid, state.clone());
        tracing::debug!(%uuid, temp, restored, "created player state");
        state
    }

    /// Drops the live state, saving it first when dirty. Returns false, and
    /// keeps the state, when the save fails.
    pub fn release(&self, uuid: Uuid) -> bool {
        let mut shard = self.shard(&uuid);
        let Some(state) = shard.get(&uuid) else {
            return false;
        };
        if !state.is_temp() && state.is_dirty() && !self.save(state) {
            tracing::warn!(%uuid, "failed to save player state on release");
            return false;
        }
        shard.remove(&uuid);
        tracing::info!(%uuid, "released player state");
        true
    }

    /// Forgets the player, live and persisted.
    pub fn remove(&self, uuid: Uuid) {
        self.shard(&uuid).remove(&uuid);
        self.store.del(&Self::key(&uuid));
    }

    pub fn remove_temps(&self) {
        for shard in &self.shards {
            shard
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|_, state| !state.is_temp());
        }
    }

    /// Saves every dirty persistent state. Returns how many were written.
    pub fn flush_all(&self) -> usize {
        let mut saved = 0;
        for shard in &self.shards {
            let shard = shard.lock().unwrap_or_else(|e| e.into_inner());
            for state in shard.values() {
                if !state.is_temp() && state.is_dirty() && self.save(state) {
                    saved += 1;
                }
            }
        }
        if saved > 0 {
            tracing::info!(saved, "flushed player states");
        }
        saved
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(|e| e.into_inner()).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Routes a host interaction to the player's state machine.
    pub fn on_click(&self, uuid: Uuid, temp: bool, event: &ClickEvent) -> ClickState {
        self.get_or_create(uuid, temp).handle_click(event)
    }
}

impl Drop for PlayerStateManager {
    fn drop(&mut self) {
        self.flush_all();
    }
}
