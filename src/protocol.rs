use crate::types::{GamePhase, GameState};
use serde::{Deserialize, Serialize};

/// UI transition raised after a fresh snapshot arrives. The view layer maps
/// these onto navigation; this crate only decides which one applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum UiUpdate {
    /// A game appeared, changed while still gathering players, or was
    /// deleted entirely
    RefreshGameList,
    /// Stay put, redraw with the new snapshot
    Refresh,
    NavigateToDrawing,
    NavigateToCaptionEntry,
    NavigateToResults,
    NavigateToGameOver,
}

/// The phase-to-screen mapping table, from the viewing player's perspective.
/// Whether the viewer is the lead on the drawing screen is a view-layer
/// concern, not decided here.
pub fn ui_update_for(state: &GameState, player_id: &str) -> UiUpdate {
    match state.phase.normalized() {
        GamePhase::WaitingForPlayers => UiUpdate::RefreshGameList,
        GamePhase::WaitingForDrawing | GamePhase::WaitingForNextRound => UiUpdate::NavigateToDrawing,
        GamePhase::WaitingForCaptions => {
            // The lead already contributed the drawing; captioners who
            // submitted just wait for the rest
            if state.lead_player_id == player_id || state.has_captioned(player_id) {
                UiUpdate::Refresh
            } else {
                UiUpdate::NavigateToCaptionEntry
            }
        }
        GamePhase::WaitingForResult => UiUpdate::NavigateToResults,
        GamePhase::GameOver => UiUpdate::NavigateToGameOver,
    }
}
