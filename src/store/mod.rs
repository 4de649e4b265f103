mod memory;

pub use memory::MemoryStore;

use crate::types::{GameId, GameState, PlayerId};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::broadcast;

/// Errors at the store boundary. Game-state operations themselves never
/// fail; only persistence calls do, and failures propagate one level up for
/// user-facing reporting.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store communication failure: {0}")]
    Communication(String),
    #[error("no record found for game {0}")]
    NotFound(GameId),
    /// A fetched document is missing fields or otherwise undecodable. The
    /// snapshot is discarded, never partially applied.
    #[error("malformed game document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Change notification pushed to subscribed clients
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Updated(GameState),
    Removed(GameId),
}

/// Boundary contract with the external document store: whole-snapshot
/// persistence keyed by record id, field-filtered queries, and push-based
/// change notifications. The store's native field-to-value document format
/// is used as-is; there is no wire protocol of our own.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Serialize and write a snapshot, overwriting any record with the same
    /// key (last write wins)
    async fn persist(&self, state: &GameState) -> Result<(), StoreError>;

    async fn fetch(&self, game_id: &str) -> Result<GameState, StoreError>;

    async fn delete(&self, game_id: &str) -> Result<(), StoreError>;

    /// Field-filtered query: every persisted game whose roster contains the
    /// player
    async fn games_for_player(&self, player_id: &str) -> Result<Vec<GameState>, StoreError>;

    /// Subscribe to changes for games containing the player
    async fn subscribe(&self, player_id: &str) -> Result<GameSubscription, StoreError>;
}

/// A live change feed filtered down to one player's games.
///
/// Removal events carry only the record id, so the subscription remembers
/// which game ids it has seen the player in (seeded with the games persisted
/// at subscribe time).
pub struct GameSubscription {
    player_id: PlayerId,
    known_games: HashSet<GameId>,
    rx: broadcast::Receiver<StoreEvent>,
}

impl GameSubscription {
    pub(crate) fn new(
        player_id: PlayerId,
        known_games: HashSet<GameId>,
        rx: broadcast::Receiver<StoreEvent>,
    ) -> Self {
        Self {
            player_id,
            known_games,
            rx,
        }
    }

    /// Next event involving the subscribed player, or None once the store
    /// is gone
    pub async fn next(&mut self) -> Option<StoreEvent> {
        loop {
            match self.rx.recv().await {
                Ok(StoreEvent::Updated(state)) => {
                    if state.player(&self.player_id).is_some() {
                        self.known_games.insert(state.record_id.clone());
                        return Some(StoreEvent::Updated(state));
                    }
                }
                Ok(StoreEvent::Removed(game_id)) => {
                    if self.known_games.remove(&game_id) {
                        return Some(StoreEvent::Removed(game_id));
                    }
                }
                // Missed events: the next snapshot overwrites local state
                // anyway, so just keep reading
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
