//! TCP listener and per-connection admission.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};

use crate::config::ServerConfig;
use crate::lobby::Lobby;
use crate::matchmaker::Matchmaker;
use crate::player::Player;
use crate::protocol::{Message, StatusKind};
use crate::transport::tcp::TcpTransport;
use crate::transport::Transport;

/// Longest display name kept from an `identify` message, in characters.
pub const MAX_NAME_LEN: usize = 32;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Server {
    listener: TcpListener,
    lobby: Arc<Lobby>,
    config: ServerConfig,
}

impl Server {
    /// Validate the rules and bind the listening socket.
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        config.rules.validate().map_err(|e| anyhow::anyhow!(e))?;
        let listener = TcpListener::bind(&config.bind).await?;
        Ok(Self {
            listener,
            lobby: Arc::new(Lobby::new()),
            config,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn lobby(&self) -> Arc<Lobby> {
        self.lobby.clone()
    }

    /// Start the matchmaker and accept connections forever.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("listening on {}", self.local_addr()?);
        tokio::spawn(Matchmaker::new(self.lobby.clone(), &self.config).run());

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("accepted connection from {}", addr);
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("could not set TCP_NODELAY for {}: {}", addr, e);
                    }
                    let transport =
                        TcpTransport::with_config(stream, SEND_TIMEOUT, self.config.max_frame_len);
                    tokio::spawn(admit(self.lobby.clone(), Box::new(transport)));
                }
                Err(e) => {
                    // Usually descriptor exhaustion; back off instead of spinning.
                    error!("accept failed: {}", e);
                    sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

/// Register a new connection, read its `identify` and queue it.
///
/// A first message of any other kind is accepted and the peer address is
/// kept as the display name.
pub async fn admit(lobby: Arc<Lobby>, transport: Box<dyn Transport>) {
    let mut player = Player::new(transport);
    lobby.register(&player);

    match player.recv().await {
        Ok(Some(Message::Identify { display_name })) => {
            let name: String = display_name.trim().chars().take(MAX_NAME_LEN).collect();
            if !name.is_empty() {
                player.set_name(name);
                lobby.rename(player.id(), player.name());
            }
            info!("{} identified as {}", player.peer_label(), player.name());
        }
        Ok(Some(other)) => {
            warn!(
                "{} sent {} before identifying; keeping its address as name",
                player.peer_label(),
                other.kind()
            );
        }
        Ok(None) => {
            info!("{} left before identifying", player.peer_label());
            lobby.deregister(player.id());
            return;
        }
        Err(e) => {
            warn!("could not read identify from {}: {}", player.peer_label(), e);
            player.close().await;
            lobby.deregister(player.id());
            return;
        }
    }

    let waiting = Message::status(
        StatusKind::Waiting,
        "You are in the queue, waiting for an opponent...",
    );
    if let Err(e) = player.send(&waiting).await {
        warn!("could not greet {}: {}", player.name(), e);
        player.close().await;
        lobby.deregister(player.id());
        return;
    }
    lobby.enqueue(player);
}
