mod common;

use std::sync::Arc;

use broadside::{
    LifecycleState, Lobby, Matchmaker, Message, ServerConfig, SessionOutcome, StatusKind,
};
use common::*;
use tokio::time::{timeout, Duration};

fn seeded_config() -> ServerConfig {
    ServerConfig {
        seed: Some(7),
        ..ServerConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn dead_player_is_dropped_and_survivor_keeps_its_place() -> anyhow::Result<()> {
    let lobby = Arc::new(Lobby::new());
    let mut matchmaker = Matchmaker::new(lobby.clone(), &seeded_config());

    let (ghost, ghost_client) = connected_player("Ghost");
    let (alice, mut alice_client) = connected_player("Alice");
    let (ghost_id, alice_id) = (ghost.id(), alice.id());
    for player in [&ghost, &alice] {
        lobby.register(player);
    }
    lobby.enqueue(ghost);
    lobby.enqueue(alice);
    drop(ghost_client);

    assert!(matchmaker.match_next().await.is_none());
    assert!(lobby.player(ghost_id).is_none());
    assert_eq!(lobby.player_state(alice_id), Some(LifecycleState::Queued));
    assert_eq!(lobby.queued_players(), 1);

    // A later arrival is paired behind Alice, who keeps the first seat.
    let (bob, mut bob_client) = connected_player("Bob");
    lobby.register(&bob);
    lobby.enqueue(bob);
    let session = matchmaker.match_next().await.expect("session should start");

    let paired = expect_status(&mut alice_client, StatusKind::Paired).await;
    assert!(paired.contains("Bob"));
    expect_status(&mut bob_client, StatusKind::Paired).await;
    assert_eq!(lobby.active_matches(), 1);
    assert_eq!(lobby.player_state(alice_id), Some(LifecycleState::InGame));

    expect_board_update(&mut alice_client).await;
    expect_status(&mut alice_client, StatusKind::YourTurn).await;
    drop(alice_client);

    let outcome = timeout(Duration::from_secs(5), session).await??;
    assert!(matches!(outcome, Some(SessionOutcome::Aborted(_))));
    assert_eq!(lobby.active_matches(), 0);
    assert_eq!(lobby.connected_players(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn both_dead_leaves_queue_empty() {
    let lobby = Arc::new(Lobby::new());
    let mut matchmaker = Matchmaker::new(lobby.clone(), &seeded_config());
    let (a, a_client) = connected_player("A");
    let (b, b_client) = connected_player("B");
    lobby.register(&a);
    lobby.register(&b);
    lobby.enqueue(a);
    lobby.enqueue(b);
    drop(a_client);
    drop(b_client);

    assert!(matchmaker.match_next().await.is_none());
    assert_eq!(lobby.queued_players(), 0);
    assert_eq!(lobby.connected_players(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_rules_reject_the_pair_without_stopping() {
    let lobby = Arc::new(Lobby::new());
    let mut config = seeded_config();
    config.rules.ship_lengths = vec![11];
    let mut matchmaker = Matchmaker::new(lobby.clone(), &config);

    let (a, mut a_client) = connected_player("A");
    let (b, _b_client) = connected_player("B");
    lobby.register(&a);
    lobby.register(&b);
    lobby.enqueue(a);
    lobby.enqueue(b);

    assert!(matchmaker.match_next().await.is_none());
    assert!(matches!(next(&mut a_client).await, Message::Error { .. }));
    expect_closed(&mut a_client).await;
    assert_eq!(lobby.connected_players(), 0);
    assert_eq!(lobby.active_matches(), 0);
}
