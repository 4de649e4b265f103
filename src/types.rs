use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type GameId = String;
pub type PlayerId = String;
pub type CaptionId = String;
/// Opaque reference to a stored drawing image (the store owns the bytes)
pub type DrawingRef = String;

/// Minimum participants for a playable game (one lead + two captioners).
/// A game with fewer active players is abandoned.
pub const MINIMUM_PLAYERS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Invited,
    Accepted,
    Denied,
    Quit,
    SentDrawing,
    SentCaption,
    Done,
}

impl PlayerStatus {
    /// Denied and quit players are out of the rotation but stay on the
    /// roster for display.
    pub fn is_active(self) -> bool {
        !matches!(self, PlayerStatus::Denied | PlayerStatus::Quit)
    }

    /// Check if a status transition is legal
    pub fn can_transition_to(self, to: PlayerStatus) -> bool {
        use PlayerStatus::*;

        match (self, to) {
            // Re-applying the current status is harmless (stale snapshots
            // can replay an action we already saw)
            (from, to) if from == to => true,

            (Invited, Accepted) | (Invited, Denied) => true,

            // Round play
            (Accepted, SentDrawing) | (Accepted, SentCaption) => true,
            (SentDrawing, Accepted) | (SentCaption, Accepted) => true,

            // Any active player can quit or acknowledge the final result
            (Accepted, Quit) | (SentDrawing, Quit) | (SentCaption, Quit) => true,
            (Accepted, Done) | (SentDrawing, Done) | (SentCaption, Done) => true,

            // Denied, Quit, and Done are terminal
            _ => false,
        }
    }
}

/// Overall stage of a game, derivable from player statuses and points.
///
/// `WaitingForNextRound` is kept so documents written by older clients still
/// deserialize; derivation never produces it and it normalizes to
/// `WaitingForDrawing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    WaitingForPlayers,
    WaitingForDrawing,
    WaitingForCaptions,
    WaitingForResult,
    WaitingForNextRound,
    GameOver,
}

impl GamePhase {
    /// Collapse the legacy between-rounds value into its live equivalent
    pub fn normalized(self) -> GamePhase {
        match self {
            GamePhase::WaitingForNextRound => GamePhase::WaitingForDrawing,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    pub points_to_win: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { points_to_win: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub status: PlayerStatus,
    pub points: u32,
}

impl Player {
    pub fn new(id: PlayerId, display_name: impl Into<String>, status: PlayerStatus) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            status,
            points: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Caption {
    pub id: CaptionId,
    pub author_id: PlayerId,
    pub text: String,
    pub ts: String,
}

/// The current round's drawing and the captions submitted against it.
/// Cleared when the lead role rotates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoundArtifacts {
    pub drawing: Option<DrawingRef>,
    pub captions: Vec<Caption>,
}

impl RoundArtifacts {
    pub fn clear(&mut self) {
        self.drawing = None;
        self.captions.clear();
    }
}

/// One game instance: the roster, who leads, the round artifacts, and the
/// derived phase. This is the complete snapshot persisted to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameState {
    pub record_id: GameId,
    /// Ordered roster; index 0 is the initial lead player and rotation walks
    /// the list
    pub players: Vec<Player>,
    pub lead_player_id: PlayerId,
    pub config: GameConfig,
    /// Materialized copy of `derive_phase()`, kept for field-filtered store
    /// queries. Written only through `refresh_phase`.
    pub phase: GamePhase,
    pub round: RoundArtifacts,
    pub created_at: String,
}
