use std::sync::Arc;

use broadside::protocol::{encode_frame, read_frame};
use broadside::{
    GameClient, GameEnd, Lobby, Message, ProtocolError, RandomBot, Server, ServerConfig,
    StatusKind, TcpTransport, Transport, MAX_FRAME_LEN,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Duration};

async fn start_server() -> (String, Arc<Lobby>) {
    let config = ServerConfig {
        bind: "127.0.0.1:0".to_string(),
        seed: Some(9),
        ..ServerConfig::default()
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let lobby = server.lobby();
    tokio::spawn(server.run());
    (addr, lobby)
}

async fn wait_for(lobby: &Lobby, players: usize) {
    timeout(Duration::from_secs(5), async {
        while lobby.connected_players() != players {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("lobby did not settle");
}

/// Two connected TCP transports over loopback.
async fn tcp_pair() -> (TcpTransport, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server_side, _) = listener.accept().await.unwrap();
    (TcpTransport::new(server_side), client)
}

#[tokio::test(flavor = "multi_thread")]
async fn truncated_frame_mid_game_aborts_the_match() -> anyhow::Result<()> {
    let (addr, lobby) = start_server().await;

    let mut raw = TcpStream::connect(&addr).await?;
    raw.write_all(&encode_frame(&Message::Identify {
        display_name: "Mallory".into(),
    })?)
    .await?;
    wait_for(&lobby, 1).await;

    let honest = tokio::spawn({
        let addr = addr.clone();
        async move {
            let mut client = GameClient::connect(addr.as_str(), "Honest").await?;
            let mut bot = RandomBot::new(SmallRng::seed_from_u64(3));
            client.play(&mut bot).await
        }
    });

    // Wait for our turn, then promise 500 bytes and deliver 10.
    wait_for_turn(&mut raw).await?;
    raw.write_all(&500u32.to_be_bytes()).await?;
    raw.write_all(&[b'x'; 10]).await?;
    raw.shutdown().await?;

    let end = timeout(Duration::from_secs(5), honest).await???;
    match end {
        GameEnd::OpponentLeft(text) => assert!(text.contains("Mallory")),
        other => panic!("expected the opponent to leave, got {:?}", other),
    }
    wait_for(&lobby, 0).await;
    assert_eq!(lobby.active_matches(), 0);
    Ok(())
}

async fn wait_for_turn(raw: &mut TcpStream) -> anyhow::Result<()> {
    loop {
        let msg = timeout(Duration::from_secs(5), read_frame(raw, MAX_FRAME_LEN))
            .await??
            .ok_or_else(|| anyhow::anyhow!("server hung up early"))?;
        if let Message::StatusUpdate {
            kind: StatusKind::YourTurn,
            ..
        } = msg
        {
            return Ok(());
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn huge_coordinates_get_an_error_and_keep_the_turn() -> anyhow::Result<()> {
    let (addr, lobby) = start_server().await;

    let mut raw = TcpStream::connect(&addr).await?;
    raw.write_all(&encode_frame(&Message::Identify {
        display_name: "Mallory".into(),
    })?)
    .await?;
    wait_for(&lobby, 1).await;

    let honest = tokio::spawn({
        let addr = addr.clone();
        async move {
            let mut client = GameClient::connect(addr.as_str(), "Honest").await?;
            let mut bot = RandomBot::new(SmallRng::seed_from_u64(4));
            client.play(&mut bot).await
        }
    });

    wait_for_turn(&mut raw).await?;
    let payload = br#"{"type":"move","data":{"row":99999999999999999999,"col":0}}"#;
    raw.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    raw.write_all(payload).await?;

    let reply = timeout(Duration::from_secs(5), read_frame(&mut raw, MAX_FRAME_LEN)).await??;
    assert_eq!(reply, Some(Message::error("Invalid move coordinates.")));
    let again = timeout(Duration::from_secs(5), read_frame(&mut raw, MAX_FRAME_LEN)).await??;
    assert!(matches!(
        again,
        Some(Message::StatusUpdate {
            kind: StatusKind::YourTurn,
            ..
        })
    ));
    assert_eq!(lobby.active_matches(), 1);

    raw.shutdown().await?;
    let end = timeout(Duration::from_secs(5), honest).await???;
    assert!(matches!(end, GameEnd::OpponentLeft(_)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn garbage_before_identify_drops_only_that_connection() -> anyhow::Result<()> {
    let (addr, lobby) = start_server().await;

    let mut raw = TcpStream::connect(&addr).await?;
    let garbage = b"{ not json";
    raw.write_all(&(garbage.len() as u32).to_be_bytes()).await?;
    raw.write_all(garbage).await?;

    // The server closes the connection without answering.
    let reply = timeout(Duration::from_secs(5), read_frame(&mut raw, MAX_FRAME_LEN)).await?;
    assert!(matches!(reply, Ok(None) | Err(ProtocolError::Closed)));
    wait_for(&lobby, 0).await;

    // The server is still accepting.
    let mut client = GameClient::connect(addr.as_str(), "Later").await?;
    let msg = timeout(Duration::from_secs(5), client.next_message()).await??;
    assert!(matches!(
        msg,
        Some(Message::StatusUpdate {
            kind: StatusKind::Waiting,
            ..
        })
    ));
    timeout(Duration::from_secs(5), async {
        while lobby.queued_players() != 1 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_prefix_is_rejected_before_allocating() -> anyhow::Result<()> {
    let (mut transport, mut client) = tcp_pair().await;
    client.write_all(&u32::MAX.to_be_bytes()).await?;
    match transport.recv().await {
        Err(ProtocolError::TooLarge { len, max }) => {
            assert_eq!(len, u32::MAX);
            assert_eq!(max, MAX_FRAME_LEN);
        }
        other => panic!("expected TooLarge, got {:?}", other),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn clean_close_between_frames_is_not_an_error() -> anyhow::Result<()> {
    let (mut transport, mut client) = tcp_pair().await;
    client
        .write_all(&encode_frame(&Message::Move { row: 1, col: 2 })?)
        .await?;
    client.shutdown().await?;

    assert_eq!(transport.recv().await?, Some(Message::Move { row: 1, col: 2 }));
    assert_eq!(transport.recv().await?, None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn liveness_check_notices_a_vanished_peer() -> anyhow::Result<()> {
    let (mut transport, client) = tcp_pair().await;
    assert!(transport.is_open().await);
    drop(client);
    timeout(Duration::from_secs(5), async {
        while transport.is_open().await {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}
