mod game;

pub use game::GameError;

use crate::types::{GameId, GameState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Client-local mirror of the games this device is part of.
///
/// Owned by whoever drives the coordinator and passed by handle; there is no
/// process-wide game list. Snapshots arriving from the store simply overwrite
/// whatever is held here (last write wins).
#[derive(Clone)]
pub struct GameRepository {
    games: Arc<RwLock<HashMap<GameId, GameState>>>,
}

impl GameRepository {
    pub fn new() -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, game_id: &str) -> Option<GameState> {
        self.games.read().await.get(game_id).cloned()
    }

    /// Insert or overwrite a game snapshot
    pub async fn upsert(&self, state: GameState) {
        self.games
            .write()
            .await
            .insert(state.record_id.clone(), state);
    }

    pub async fn remove(&self, game_id: &str) -> Option<GameState> {
        self.games.write().await.remove(game_id)
    }

    /// Games whose roster contains the given player
    pub async fn games_for_player(&self, player_id: &str) -> Vec<GameState> {
        self.games
            .read()
            .await
            .values()
            .filter(|g| g.player(player_id).is_some())
            .cloned()
            .collect()
    }

    /// Apply a mutation to a held game and return the mutated snapshot for
    /// persisting. Returns None if the game is not held locally.
    pub async fn update<F>(&self, game_id: &str, mutate: F) -> Option<GameState>
    where
        F: FnOnce(&mut GameState),
    {
        let mut games = self.games.write().await;
        let state = games.get_mut(game_id)?;
        mutate(state);
        Some(state.clone())
    }
}

impl Default for GameRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameConfig;

    fn sample_game() -> GameState {
        GameState::new(
            "alice".to_string(),
            "Alice",
            vec![
                ("bob".to_string(), "Bob".to_string()),
                ("carol".to_string(), "Carol".to_string()),
            ],
            GameConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = GameRepository::new();
        let game = sample_game();
        let id = game.record_id.clone();

        repo.upsert(game.clone()).await;
        assert_eq!(repo.get(&id).await, Some(game));
    }

    #[tokio::test]
    async fn test_games_for_player_filters_by_roster() {
        let repo = GameRepository::new();
        repo.upsert(sample_game()).await;
        repo.upsert(sample_game()).await;

        assert_eq!(repo.games_for_player("bob").await.len(), 2);
        assert!(repo.games_for_player("mallory").await.is_empty());
    }

    #[tokio::test]
    async fn test_update_returns_mutated_snapshot() {
        let repo = GameRepository::new();
        let game = sample_game();
        let id = game.record_id.clone();
        repo.upsert(game).await;

        let snapshot = repo
            .update(&id, |g| g.respond_to_invitation("bob", true))
            .await
            .unwrap();
        assert_eq!(
            snapshot.status_of("bob"),
            crate::types::PlayerStatus::Accepted
        );

        // Mutation visible on later reads
        let held = repo.get(&id).await.unwrap();
        assert_eq!(held.status_of("bob"), crate::types::PlayerStatus::Accepted);
    }

    #[tokio::test]
    async fn test_update_unknown_game_is_none() {
        let repo = GameRepository::new();
        assert!(repo.update("missing", |_| {}).await.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = GameRepository::new();
        let game = sample_game();
        let id = game.record_id.clone();
        repo.upsert(game).await;

        assert!(repo.remove(&id).await.is_some());
        assert!(repo.get(&id).await.is_none());
    }
}
