use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memething::coordinator::TurnCoordinator;
use memething::store::{GameStore, MemoryStore};
use memething::types::GameConfig;

/// Scripted three-player game against the in-memory store, one coordinator
/// per simulated device. Useful for watching phase transitions and UI
/// updates in the logs.
#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memething=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting MemeThing demo game...");

    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

    let alice = TurnCoordinator::new("alice".to_string(), store.clone());
    let bob = TurnCoordinator::new("bob".to_string(), store.clone());
    let carol = TurnCoordinator::new("carol".to_string(), store.clone());

    let mut bob_feed = store.subscribe("bob").await.expect("subscribe failed");

    let game = alice
        .create_game(
            "Alice",
            vec![
                ("bob".to_string(), "Bob".to_string()),
                ("carol".to_string(), "Carol".to_string()),
            ],
            GameConfig { points_to_win: 2 },
        )
        .await
        .expect("failed to create game");
    let game_id = game.record_id.clone();

    // Bob learns about the game from his change feed
    if let Some(event) = bob_feed.next().await {
        let update = bob.apply_snapshot(event).await;
        tracing::info!(?update, "bob's client reacted to the invitation");
    }
    carol.refresh_from_store().await.expect("query failed");

    bob.respond_to_invitation(&game_id, true)
        .await
        .expect("bob could not accept");
    carol
        .respond_to_invitation(&game_id, true)
        .await
        .expect("carol could not accept");

    // Everyone mirrors the latest snapshot before play starts
    for coordinator in [&alice, &bob, &carol] {
        coordinator
            .refresh_from_store()
            .await
            .expect("query failed");
    }

    // Play rounds until someone reaches the threshold
    loop {
        let snapshot = alice
            .repository()
            .get(&game_id)
            .await
            .expect("game vanished mid-demo");
        let lead = snapshot.lead_player_id.clone();
        tracing::info!(phase = ?snapshot.phase, %lead, "starting round");

        let lead_client = match lead.as_str() {
            "alice" => &alice,
            "bob" => &bob,
            "carol" => &carol,
            other => panic!("unexpected lead player {}", other),
        };

        lead_client
            .submit_drawing(&game_id, format!("drawing-by-{}", lead))
            .await
            .expect("drawing submission failed");

        for client in [&alice, &bob, &carol] {
            if client.player_id() != &lead {
                client.refresh_from_store().await.expect("query failed");
                client
                    .submit_caption(&game_id, format!("{}'s caption", client.player_id()))
                    .await
                    .expect("caption submission failed");
            }
        }

        lead_client.refresh_from_store().await.expect("query failed");
        let snapshot = lead_client
            .repository()
            .get(&game_id)
            .await
            .expect("game vanished mid-demo");
        let winning_caption = snapshot.round.captions[0].id.clone();
        let after = lead_client
            .select_winner(&game_id, &winning_caption)
            .await
            .expect("winner selection failed");

        for client in [&alice, &bob, &carol] {
            client.refresh_from_store().await.expect("query failed");
        }

        if let Some(winner) = after.game_winner() {
            tracing::info!(winner = %winner.display_name, points = winner.points, "game over");
            break;
        }
    }

    // Everyone acknowledges; the last leave deletes the record. Each client
    // re-mirrors first so it sees the others' acknowledgements.
    for client in [&alice, &bob, &carol] {
        client.refresh_from_store().await.expect("query failed");
        client.leave(&game_id).await.expect("leave failed");
    }

    match store.fetch(&game_id).await {
        Err(e) => tracing::info!("game record cleaned up: {}", e),
        Ok(_) => tracing::warn!("game record unexpectedly still present"),
    }
}
