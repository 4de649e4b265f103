use super::{GameStore, GameSubscription, StoreError, StoreEvent};
use crate::types::{GameId, GameState};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// In-memory reference implementation of the document store.
///
/// Documents are plain field-to-value maps, the same shape a hosted document
/// database hands back, so decoding failures surface here exactly as they
/// would against the real store. Writes blindly overwrite; concurrent
/// editors resolve by last write wins.
#[derive(Clone)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<GameId, serde_json::Value>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            events: tx,
        }
    }

    /// Insert a raw document, bypassing serialization. Test hook for
    /// exercising malformed-snapshot handling.
    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, game_id: GameId, document: serde_json::Value) {
        self.documents.write().await.insert(game_id, document);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn persist(&self, state: &GameState) -> Result<(), StoreError> {
        let document = serde_json::to_value(state)?;
        self.documents
            .write()
            .await
            .insert(state.record_id.clone(), document);
        tracing::debug!(game = %state.record_id, phase = ?state.phase, "persisted game");

        // No receivers connected is fine
        let _ = self.events.send(StoreEvent::Updated(state.clone()));
        Ok(())
    }

    async fn fetch(&self, game_id: &str) -> Result<GameState, StoreError> {
        let document = self
            .documents
            .read()
            .await
            .get(game_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(game_id.to_string()))?;
        Ok(serde_json::from_value(document)?)
    }

    async fn delete(&self, game_id: &str) -> Result<(), StoreError> {
        let removed = self.documents.write().await.remove(game_id);
        if removed.is_none() {
            return Err(StoreError::NotFound(game_id.to_string()));
        }
        tracing::debug!(game = %game_id, "deleted game record");

        let _ = self.events.send(StoreEvent::Removed(game_id.to_string()));
        Ok(())
    }

    async fn games_for_player(&self, player_id: &str) -> Result<Vec<GameState>, StoreError> {
        let documents = self.documents.read().await;
        let mut games = Vec::new();
        for (game_id, document) in documents.iter() {
            match serde_json::from_value::<GameState>(document.clone()) {
                Ok(state) => {
                    if state.player(player_id).is_some() {
                        games.push(state);
                    }
                }
                // One corrupt record should not blind the client to the
                // rest of its games
                Err(e) => {
                    tracing::warn!(game = %game_id, error = %e, "discarding malformed game document");
                }
            }
        }
        Ok(games)
    }

    async fn subscribe(&self, player_id: &str) -> Result<GameSubscription, StoreError> {
        let known_games: HashSet<GameId> = self
            .games_for_player(player_id)
            .await?
            .into_iter()
            .map(|g| g.record_id)
            .collect();

        Ok(GameSubscription::new(
            player_id.to_string(),
            known_games,
            self.events.subscribe(),
        ))
    }
}
