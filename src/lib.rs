mod board;
pub mod client;
mod common;
mod config;
pub mod lobby;
mod logging;
pub mod matchmaker;
pub mod player;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod server;
pub mod session;
mod ship;
pub mod transport;

pub use board::*;
pub use client::{parse_coord, GameClient, GameEnd, HumanPlayer, RandomBot, Strategy};
pub use common::*;
pub use config::*;
pub use lobby::Lobby;
pub use logging::init_logging;
pub use matchmaker::Matchmaker;
pub use player::{LifecycleState, Player, PlayerId};
pub use protocol::{Message, ProtocolError, StatusKind};
pub use queue::WaitingQueue;
pub use server::Server;
pub use session::{AbortReason, GameSession, SessionOutcome, SessionStatus, TurnResult};
pub use ship::*;
pub use transport::in_memory::InMemoryTransport;
pub use transport::tcp::TcpTransport;
pub use transport::Transport;
