use crate::protocol::{ui_update_for, UiUpdate};
use crate::state::GameRepository;
use crate::store::{GameStore, StoreError, StoreEvent};
use crate::types::*;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Acting on a game this client does not hold (e.g. already deleted by
    /// another player). A real failure for save-type actions; leave-type
    /// actions treat it as a no-op instead.
    #[error("game {0} is not held by this client")]
    UnknownGame(GameId),
    #[error("a game needs at least {MINIMUM_PLAYERS} participants, got {0}")]
    NotEnoughPlayers(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sequences game-state operations in response to player actions and decides
/// when to persist or delete the remote record.
///
/// Intentionally thin: each action is one `GameState` mutation followed by a
/// persist-or-delete. There are no retries and no rollback; a failed persist
/// leaves the local mutation applied and unsent, and the caller surfaces the
/// error (re-fetching server state before retrying is their call).
pub struct TurnCoordinator {
    player_id: PlayerId,
    repo: GameRepository,
    store: Arc<dyn GameStore>,
}

impl TurnCoordinator {
    pub fn new(player_id: PlayerId, store: Arc<dyn GameStore>) -> Self {
        Self {
            player_id,
            repo: GameRepository::new(),
            store,
        }
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn repository(&self) -> &GameRepository {
        &self.repo
    }

    /// Start a new game with this player leading and the given friends
    /// invited. At least two invitees are required.
    pub async fn create_game(
        &self,
        display_name: impl Into<String>,
        invitees: Vec<(PlayerId, String)>,
        config: GameConfig,
    ) -> Result<GameState, CoordinatorError> {
        let participant_count = invitees.len() + 1;
        if participant_count < MINIMUM_PLAYERS {
            return Err(CoordinatorError::NotEnoughPlayers(participant_count));
        }

        let state = GameState::new(self.player_id.clone(), display_name, invitees, config);
        tracing::info!(game = %state.record_id, players = state.players.len(), "created game");

        self.repo.upsert(state.clone()).await;
        self.store.persist(&state).await?;
        Ok(state)
    }

    /// Pull every game containing this player from the store into the local
    /// mirror
    pub async fn refresh_from_store(&self) -> Result<Vec<GameState>, CoordinatorError> {
        let games = self.store.games_for_player(&self.player_id).await?;
        for game in &games {
            self.repo.upsert(game.clone()).await;
        }
        Ok(games)
    }

    async fn mutate_and_persist<F>(
        &self,
        game_id: &str,
        mutate: F,
    ) -> Result<GameState, CoordinatorError>
    where
        F: FnOnce(&mut GameState),
    {
        let snapshot = self
            .repo
            .update(game_id, mutate)
            .await
            .ok_or_else(|| CoordinatorError::UnknownGame(game_id.to_string()))?;
        self.store.persist(&snapshot).await?;
        Ok(snapshot)
    }

    /// Accept or decline an invitation. Declining below the player minimum
    /// abandons the game and deletes the record outright.
    pub async fn respond_to_invitation(
        &self,
        game_id: &str,
        accepted: bool,
    ) -> Result<Option<GameState>, CoordinatorError> {
        let player_id = self.player_id.clone();
        let snapshot = self
            .repo
            .update(game_id, |g| g.respond_to_invitation(&player_id, accepted))
            .await
            .ok_or_else(|| CoordinatorError::UnknownGame(game_id.to_string()))?;

        if snapshot.is_abandoned() {
            tracing::info!(game = %game_id, "too few players remain, abandoning game");
            self.repo.remove(game_id).await;
            match self.store.delete(game_id).await {
                // Another player may have torn it down first
                Ok(()) | Err(StoreError::NotFound(_)) => Ok(None),
                Err(e) => Err(e.into()),
            }
        } else {
            self.store.persist(&snapshot).await?;
            Ok(Some(snapshot))
        }
    }

    pub async fn submit_drawing(
        &self,
        game_id: &str,
        drawing: DrawingRef,
    ) -> Result<GameState, CoordinatorError> {
        let player_id = self.player_id.clone();
        self.mutate_and_persist(game_id, |g| g.submit_drawing(&player_id, drawing))
            .await
    }

    pub async fn submit_caption(
        &self,
        game_id: &str,
        text: impl Into<String>,
    ) -> Result<GameState, CoordinatorError> {
        let player_id = self.player_id.clone();
        let text = text.into();
        self.mutate_and_persist(game_id, |g| {
            g.submit_caption(&player_id, text);
        })
        .await
    }

    /// Award the round to a caption and, unless that ended the game, rotate
    /// the lead into the next round
    pub async fn select_winner(
        &self,
        game_id: &str,
        caption_id: &str,
    ) -> Result<GameState, CoordinatorError> {
        self.mutate_and_persist(game_id, |g| {
            g.select_winning_caption(caption_id);
            if g.phase != GamePhase::GameOver {
                g.advance_round();
            }
        })
        .await
    }

    /// Drop out of a running game. The record survives so remaining players
    /// can keep going (or see the game end if too few are left).
    pub async fn quit(&self, game_id: &str) -> Result<GameState, CoordinatorError> {
        let player_id = self.player_id.clone();
        let snapshot = self
            .mutate_and_persist(game_id, |g| g.quit(&player_id))
            .await?;
        tracing::info!(game = %game_id, player = %self.player_id, "player quit");
        Ok(snapshot)
    }

    /// Acknowledge the final result and walk away. Once every active player
    /// has done so the record is deleted. A game that is already gone is a
    /// successful no-op.
    pub async fn leave(&self, game_id: &str) -> Result<(), CoordinatorError> {
        let player_id = self.player_id.clone();
        let Some(snapshot) = self
            .repo
            .update(game_id, |g| g.mark_done(&player_id))
            .await
        else {
            return Ok(());
        };

        if snapshot.all_players_done() {
            tracing::info!(game = %game_id, "all players done, deleting game record");
            self.repo.remove(game_id).await;
            match self.store.delete(game_id).await {
                Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
                Err(e) => Err(e.into()),
            }
        } else {
            self.store.persist(&snapshot).await?;
            Ok(())
        }
    }

    /// Ingest a change notification from the store: overwrite the local
    /// mirror and decide which UI transition to raise by diffing against the
    /// locally-held phase.
    pub async fn apply_snapshot(&self, event: StoreEvent) -> UiUpdate {
        match event {
            StoreEvent::Updated(state) => {
                let previous_phase = self
                    .repo
                    .get(&state.record_id)
                    .await
                    .map(|g| g.phase.normalized());
                self.repo.upsert(state.clone()).await;

                let new_phase = state.phase.normalized();
                if previous_phase == Some(new_phase) {
                    // Same screen, fresher data
                    if new_phase == GamePhase::WaitingForPlayers {
                        UiUpdate::RefreshGameList
                    } else {
                        UiUpdate::Refresh
                    }
                } else {
                    ui_update_for(&state, &self.player_id)
                }
            }
            StoreEvent::Removed(game_id) => {
                self.repo.remove(&game_id).await;
                UiUpdate::RefreshGameList
            }
        }
    }
}
