use crate::types::*;

/// Errors from the strict status-transition path. Everything else on
/// `GameState` is a total function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("illegal status transition from {from:?} to {to:?}")]
    IllegalTransition { from: PlayerStatus, to: PlayerStatus },
}

impl GameState {
    /// Start a new game: the creator leads the first round, everyone else
    /// still has to respond to their invitation.
    pub fn new(
        lead_id: PlayerId,
        lead_name: impl Into<String>,
        invitees: impl IntoIterator<Item = (PlayerId, String)>,
        config: GameConfig,
    ) -> Self {
        let mut players = vec![Player::new(
            lead_id.clone(),
            lead_name,
            PlayerStatus::Accepted,
        )];
        players.extend(
            invitees
                .into_iter()
                .map(|(id, name)| Player::new(id, name, PlayerStatus::Invited)),
        );

        let mut state = Self {
            record_id: ulid::Ulid::new().to_string(),
            players,
            lead_player_id: lead_id,
            config,
            phase: GamePhase::WaitingForPlayers,
            round: RoundArtifacts::default(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        state.refresh_phase();
        state
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    /// Status lookup that treats unknown players as no longer active
    pub fn status_of(&self, player_id: &str) -> PlayerStatus {
        self.player(player_id)
            .map(|p| p.status)
            .unwrap_or(PlayerStatus::Quit)
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.status.is_active())
    }

    pub fn enough_players(&self) -> bool {
        self.active_players().count() >= MINIMUM_PLAYERS
    }

    /// True once too many players have declined or quit to keep playing.
    /// The persisted record should be deleted at this point.
    pub fn is_abandoned(&self) -> bool {
        !self.enough_players()
    }

    /// First player at or past the point threshold, if any
    pub fn game_winner(&self) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.points >= self.config.points_to_win)
    }

    /// True once every active player has acknowledged the final result
    pub fn all_players_done(&self) -> bool {
        self.active_players()
            .all(|p| p.status == PlayerStatus::Done)
    }

    pub fn has_captioned(&self, player_id: &str) -> bool {
        self.round.captions.iter().any(|c| c.author_id == player_id)
    }

    /// Overwrite a player's status, validating against the transition table.
    /// Unknown players are ignored.
    pub fn set_status(
        &mut self,
        player_id: &str,
        new_status: PlayerStatus,
    ) -> Result<(), GameError> {
        let Some(player) = self.player_mut(player_id) else {
            return Ok(());
        };
        if !player.status.can_transition_to(new_status) {
            return Err(GameError::IllegalTransition {
                from: player.status,
                to: new_status,
            });
        }
        player.status = new_status;
        Ok(())
    }

    /// Overwrite a player's status without legality checking. This is the
    /// original app's behavior, kept for parity; the high-level operations
    /// route through it so they stay total under stale snapshots.
    pub fn set_status_unchecked(&mut self, player_id: &str, new_status: PlayerStatus) {
        if let Some(player) = self.player_mut(player_id) {
            player.status = new_status;
        }
    }

    /// Add to a player's point total. Points never decrease. Does not touch
    /// the phase; callers refresh it separately.
    pub fn record_points(&mut self, player_id: &str, delta: u32) {
        if let Some(player) = self.player_mut(player_id) {
            player.points += delta;
        }
    }

    /// Award the round to a caption's author. Unknown caption ids are
    /// ignored (the caption may belong to a round this client no longer
    /// holds).
    pub fn select_winning_caption(&mut self, caption_id: &str) {
        let author_id = self
            .round
            .captions
            .iter()
            .find(|c| c.id == caption_id)
            .map(|c| c.author_id.clone());
        if let Some(author_id) = author_id {
            self.record_points(&author_id, 1);
        }
        self.refresh_phase();
    }

    /// Rotate the lead role to the next active player in roster order and
    /// reset the round: submitted statuses go back to `Accepted` and the
    /// drawing and captions are cleared.
    ///
    /// Rotation walks the raw roster with wraparound, skipping denied and
    /// quit players, so a mid-game quitter loses the lead without any
    /// roster compaction.
    pub fn advance_round(&mut self) {
        if let Some(lead_idx) = self
            .players
            .iter()
            .position(|p| p.id == self.lead_player_id)
        {
            let n = self.players.len();
            for step in 1..=n {
                let candidate = &self.players[(lead_idx + step) % n];
                if candidate.status.is_active() {
                    self.lead_player_id = candidate.id.clone();
                    break;
                }
            }
        }

        for player in &mut self.players {
            if matches!(
                player.status,
                PlayerStatus::SentDrawing | PlayerStatus::SentCaption
            ) {
                player.status = PlayerStatus::Accepted;
            }
        }
        self.round.clear();
        self.refresh_phase();
    }

    /// Derive the phase from the roster alone. Priority cascade: the
    /// terminal check always wins, even mid-round.
    pub fn derive_phase(&self) -> GamePhase {
        if !self.enough_players() || self.game_winner().is_some() {
            return GamePhase::GameOver;
        }

        let drawing_in = self.status_of(&self.lead_player_id) == PlayerStatus::SentDrawing;
        let all_captions_in = self
            .active_players()
            .filter(|p| p.id != self.lead_player_id)
            .all(|p| p.status == PlayerStatus::SentCaption);

        if drawing_in && all_captions_in {
            GamePhase::WaitingForResult
        } else if drawing_in {
            GamePhase::WaitingForCaptions
        } else if self
            .players
            .iter()
            .all(|p| p.status != PlayerStatus::Invited)
        {
            GamePhase::WaitingForDrawing
        } else {
            GamePhase::WaitingForPlayers
        }
    }

    /// The single write path for the materialized `phase` field
    pub fn refresh_phase(&mut self) {
        self.phase = self.derive_phase();
    }

    pub fn respond_to_invitation(&mut self, player_id: &str, accepted: bool) {
        let status = if accepted {
            PlayerStatus::Accepted
        } else {
            PlayerStatus::Denied
        };
        self.set_status_unchecked(player_id, status);
        self.refresh_phase();
    }

    /// Record the lead player's drawing for the current round
    pub fn submit_drawing(&mut self, player_id: &str, drawing: DrawingRef) {
        if self.player(player_id).is_none() {
            return;
        }
        self.round.drawing = Some(drawing);
        self.set_status_unchecked(player_id, PlayerStatus::SentDrawing);
        self.refresh_phase();
    }

    /// Add a caption to the current round. Returns the new caption's id,
    /// or None if the author is not on the roster.
    pub fn submit_caption(&mut self, player_id: &str, text: impl Into<String>) -> Option<CaptionId> {
        self.player(player_id)?;
        let caption = Caption {
            id: ulid::Ulid::new().to_string(),
            author_id: player_id.to_string(),
            text: text.into(),
            ts: chrono::Utc::now().to_rfc3339(),
        };
        let id = caption.id.clone();
        self.round.captions.push(caption);
        self.set_status_unchecked(player_id, PlayerStatus::SentCaption);
        self.refresh_phase();
        Some(id)
    }

    /// Remove a player from play. If the quitter held the lead the round is
    /// skipped outright so nobody is left waiting on a drawing that will
    /// never arrive.
    pub fn quit(&mut self, player_id: &str) {
        if self.player(player_id).is_none() {
            return;
        }
        let was_lead = self.lead_player_id == player_id;
        self.set_status_unchecked(player_id, PlayerStatus::Quit);
        if was_lead {
            self.advance_round();
        }
        self.refresh_phase();
    }

    /// Record that a player has seen the final result. Once every active
    /// player is done the caller deletes the persisted record.
    pub fn mark_done(&mut self, player_id: &str) {
        self.set_status_unchecked(player_id, PlayerStatus::Done);
        self.refresh_phase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_accepted_players() -> GameState {
        let mut state = GameState::new(
            "alice".to_string(),
            "Alice",
            vec![
                ("bob".to_string(), "Bob".to_string()),
                ("carol".to_string(), "Carol".to_string()),
            ],
            GameConfig::default(),
        );
        state.respond_to_invitation("bob", true);
        state.respond_to_invitation("carol", true);
        state
    }

    #[test]
    fn test_new_game_waits_for_players() {
        let state = GameState::new(
            "alice".to_string(),
            "Alice",
            vec![
                ("bob".to_string(), "Bob".to_string()),
                ("carol".to_string(), "Carol".to_string()),
            ],
            GameConfig::default(),
        );

        assert_eq!(state.phase, GamePhase::WaitingForPlayers);
        assert_eq!(state.lead_player_id, "alice");
        assert_eq!(state.status_of("alice"), PlayerStatus::Accepted);
        assert_eq!(state.status_of("bob"), PlayerStatus::Invited);
        assert_eq!(state.config.points_to_win, 3);
    }

    #[test]
    fn test_status_of_unknown_player_defaults_to_quit() {
        let state = three_accepted_players();
        assert_eq!(state.status_of("mallory"), PlayerStatus::Quit);
    }

    #[test]
    fn test_set_status_rejects_illegal_transition() {
        let mut state = three_accepted_players();
        state.set_status_unchecked("bob", PlayerStatus::Denied);

        let result = state.set_status("bob", PlayerStatus::SentCaption);
        assert_eq!(
            result,
            Err(GameError::IllegalTransition {
                from: PlayerStatus::Denied,
                to: PlayerStatus::SentCaption,
            })
        );
        // Status untouched
        assert_eq!(state.status_of("bob"), PlayerStatus::Denied);
    }

    #[test]
    fn test_set_status_unknown_player_is_noop() {
        let mut state = three_accepted_players();
        assert!(state.set_status("mallory", PlayerStatus::Done).is_ok());
    }

    #[test]
    fn test_set_status_same_status_is_legal() {
        let mut state = three_accepted_players();
        assert!(state.set_status("bob", PlayerStatus::Accepted).is_ok());
    }

    #[test]
    fn test_record_points_accumulates() {
        let mut state = three_accepted_players();
        state.record_points("bob", 1);
        state.record_points("bob", 1);
        assert_eq!(state.player("bob").unwrap().points, 2);
        // Phase untouched
        assert_eq!(state.phase, GamePhase::WaitingForDrawing);
    }

    #[test]
    fn test_all_responded_means_waiting_for_drawing() {
        let state = three_accepted_players();
        assert_eq!(state.phase, GamePhase::WaitingForDrawing);
    }

    #[test]
    fn test_phase_never_waiting_for_players_once_all_responded() {
        let mut state = three_accepted_players();
        assert_ne!(state.derive_phase(), GamePhase::WaitingForPlayers);

        state.submit_drawing("alice", "drawing-1".to_string());
        assert_ne!(state.derive_phase(), GamePhase::WaitingForPlayers);
    }

    #[test]
    fn test_drawing_submitted_means_waiting_for_captions() {
        let mut state = three_accepted_players();
        state.submit_drawing("alice", "drawing-1".to_string());

        assert_eq!(state.phase, GamePhase::WaitingForCaptions);
        assert_eq!(state.round.drawing.as_deref(), Some("drawing-1"));
    }

    #[test]
    fn test_all_submissions_in_means_waiting_for_result() {
        // Scenario: lead draws, both others caption
        let mut state = three_accepted_players();
        state.submit_drawing("alice", "drawing-1".to_string());
        state.submit_caption("bob", "when the build finally passes");
        assert_eq!(state.phase, GamePhase::WaitingForCaptions);

        state.submit_caption("carol", "me before coffee");
        assert_eq!(state.phase, GamePhase::WaitingForResult);
    }

    #[test]
    fn test_decline_below_minimum_abandons_game() {
        // Scenario: one of three declines before the others respond
        let mut state = GameState::new(
            "alice".to_string(),
            "Alice",
            vec![
                ("bob".to_string(), "Bob".to_string()),
                ("carol".to_string(), "Carol".to_string()),
            ],
            GameConfig::default(),
        );
        state.respond_to_invitation("bob", false);

        assert!(state.is_abandoned());
        assert_eq!(state.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_winning_caption_reaches_threshold() {
        let mut state = three_accepted_players();
        state.record_points("bob", 2);

        state.submit_drawing("alice", "drawing-1".to_string());
        let caption_id = state.submit_caption("bob", "it is wednesday").unwrap();
        state.submit_caption("carol", "no thoughts");

        state.select_winning_caption(&caption_id);

        assert_eq!(state.player("bob").unwrap().points, 3);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.game_winner().unwrap().display_name, "Bob");
    }

    #[test]
    fn test_winning_caption_awards_exactly_one_point() {
        let mut state = three_accepted_players();
        state.submit_drawing("alice", "drawing-1".to_string());
        let caption_id = state.submit_caption("bob", "nailed it").unwrap();

        let points_before: Vec<u32> = state.players.iter().map(|p| p.points).collect();
        state.select_winning_caption(&caption_id);
        let points_after: Vec<u32> = state.players.iter().map(|p| p.points).collect();

        for (before, after) in points_before.iter().zip(&points_after) {
            assert!(after >= before);
        }
        assert_eq!(state.player("bob").unwrap().points, 1);
        assert_eq!(state.player("carol").unwrap().points, 0);
    }

    #[test]
    fn test_select_unknown_caption_is_noop() {
        let mut state = three_accepted_players();
        state.select_winning_caption("nonexistent");
        assert!(state.players.iter().all(|p| p.points == 0));
    }

    #[test]
    fn test_advance_round_rotates_lead_and_resets_statuses() {
        let mut state = three_accepted_players();
        state.submit_drawing("alice", "drawing-1".to_string());
        state.submit_caption("bob", "caption");
        state.submit_caption("carol", "caption");

        state.advance_round();

        assert_eq!(state.lead_player_id, "bob");
        assert!(state
            .players
            .iter()
            .all(|p| p.status == PlayerStatus::Accepted));
        assert!(state.round.drawing.is_none());
        assert!(state.round.captions.is_empty());
        assert_eq!(state.phase, GamePhase::WaitingForDrawing);
    }

    #[test]
    fn test_advance_round_twice_moves_lead_two_positions() {
        let mut state = three_accepted_players();
        state.advance_round();
        state.advance_round();
        assert_eq!(state.lead_player_id, "carol");

        // And wraps
        state.advance_round();
        assert_eq!(state.lead_player_id, "alice");
    }

    #[test]
    fn test_advance_round_skips_quit_player() {
        let mut state = GameState::new(
            "alice".to_string(),
            "Alice",
            vec![
                ("bob".to_string(), "Bob".to_string()),
                ("carol".to_string(), "Carol".to_string()),
                ("dave".to_string(), "Dave".to_string()),
            ],
            GameConfig::default(),
        );
        state.respond_to_invitation("bob", true);
        state.respond_to_invitation("carol", true);
        state.respond_to_invitation("dave", true);
        state.quit("bob");

        state.advance_round();
        assert_eq!(state.lead_player_id, "carol");
    }

    #[test]
    fn test_lead_quit_forces_round_skip() {
        // Scenario: lead quits before submitting a drawing
        let mut state = GameState::new(
            "alice".to_string(),
            "Alice",
            vec![
                ("bob".to_string(), "Bob".to_string()),
                ("carol".to_string(), "Carol".to_string()),
                ("dave".to_string(), "Dave".to_string()),
            ],
            GameConfig::default(),
        );
        state.respond_to_invitation("bob", true);
        state.respond_to_invitation("carol", true);
        state.respond_to_invitation("dave", true);

        state.submit_caption("bob", "premature caption");
        state.quit("alice");

        assert_eq!(state.lead_player_id, "bob");
        assert_eq!(state.status_of("alice"), PlayerStatus::Quit);
        // Nobody stuck mid-submission
        assert!(state
            .active_players()
            .all(|p| p.status == PlayerStatus::Accepted));
        assert_eq!(state.phase, GamePhase::WaitingForDrawing);
    }

    #[test]
    fn test_quit_below_minimum_ends_game() {
        let mut state = three_accepted_players();
        state.quit("carol");
        assert_eq!(state.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_game_over_wins_even_mid_round() {
        let mut state = three_accepted_players();
        state.submit_drawing("alice", "drawing-1".to_string());
        state.submit_caption("bob", "caption");

        // Threshold reached out of band (e.g. a newer snapshot)
        state.record_points("carol", 3);
        assert_eq!(state.derive_phase(), GamePhase::GameOver);
    }

    #[test]
    fn test_mark_done_and_all_players_done() {
        let mut state = three_accepted_players();
        state.record_points("alice", 3);
        state.refresh_phase();
        assert_eq!(state.phase, GamePhase::GameOver);

        state.mark_done("alice");
        state.mark_done("bob");
        assert!(!state.all_players_done());

        state.mark_done("carol");
        assert!(state.all_players_done());
        assert_eq!(state.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_done_ignores_inactive_players() {
        let mut state = GameState::new(
            "alice".to_string(),
            "Alice",
            vec![
                ("bob".to_string(), "Bob".to_string()),
                ("carol".to_string(), "Carol".to_string()),
                ("dave".to_string(), "Dave".to_string()),
            ],
            GameConfig::default(),
        );
        state.respond_to_invitation("bob", true);
        state.respond_to_invitation("carol", true);
        state.respond_to_invitation("dave", false);

        state.record_points("alice", 3);
        state.mark_done("alice");
        state.mark_done("bob");
        state.mark_done("carol");
        // Dave declined and never acknowledges anything
        assert!(state.all_players_done());
    }

    #[test]
    fn test_phase_normalization() {
        assert_eq!(
            GamePhase::WaitingForNextRound.normalized(),
            GamePhase::WaitingForDrawing
        );
        assert_eq!(GamePhase::GameOver.normalized(), GamePhase::GameOver);
    }
}
