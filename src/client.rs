//! Client side of the protocol: a connection wrapper, the play loop, and two
//! ways of picking targets (a random bot and a person at the terminal).

use log::{debug, info, warn};
use rand::seq::IndexedRandom;
use rand::Rng;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::net::ToSocketAddrs;

use crate::board::{column_letter, Cell, Grid};
use crate::config::BOARD_SIZE;
use crate::protocol::{Message, StatusKind};
use crate::transport::tcp::TcpTransport;
use crate::transport::Transport;

/// A connection to the server, already identified.
pub struct GameClient {
    transport: Box<dyn Transport>,
    name: String,
}

impl GameClient {
    /// Connect over TCP and identify as `name`.
    pub async fn connect<A: ToSocketAddrs>(addr: A, name: &str) -> anyhow::Result<Self> {
        let transport = TcpTransport::connect(addr).await?;
        Self::identify(Box::new(transport), name).await
    }

    /// Identify as `name` over an existing transport.
    pub async fn identify(mut transport: Box<dyn Transport>, name: &str) -> anyhow::Result<Self> {
        transport
            .send(&Message::Identify {
                display_name: name.to_string(),
            })
            .await?;
        Ok(Self {
            transport,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next message from the server; `None` once the server has hung up.
    pub async fn next_message(&mut self) -> anyhow::Result<Option<Message>> {
        Ok(self.transport.recv().await?)
    }

    pub async fn attack(&mut self, row: usize, col: usize) -> anyhow::Result<()> {
        self.transport
            .send(&Message::Move {
                row: row as i64,
                col: col as i64,
            })
            .await?;
        Ok(())
    }

    /// Play until the server sends a result or reports the opponent gone.
    pub async fn play<S>(&mut self, strategy: &mut S) -> anyhow::Result<GameEnd>
    where
        S: Strategy + ?Sized,
    {
        loop {
            let msg = self
                .next_message()
                .await?
                .ok_or_else(|| anyhow::anyhow!("server closed the connection"))?;
            match msg {
                Message::StatusUpdate {
                    kind: StatusKind::YourTurn,
                    text,
                } => {
                    info!("{}", text);
                    let (row, col) = strategy.choose_target().await?;
                    debug!("{} attacks {}{}", self.name, column_letter(col), row + 1);
                    self.attack(row, col).await?;
                }
                Message::StatusUpdate {
                    kind: StatusKind::OpponentDisconnected,
                    text,
                } => return Ok(GameEnd::OpponentLeft(text)),
                Message::StatusUpdate { text, .. } => info!("{}", text),
                Message::BoardUpdate {
                    own_board,
                    opponent_board,
                    text,
                } => {
                    info!("{}", text);
                    strategy.observe(&own_board, &opponent_board);
                }
                Message::GameResult { winner_name, text } => {
                    info!("{} (winner: {})", text, winner_name);
                    return Ok(GameEnd::Finished { winner_name, text });
                }
                Message::Error { text } => warn!("server error: {}", text),
                other => warn!("unexpected {} from server", other.kind()),
            }
        }
    }

    pub async fn close(&mut self) {
        self.transport.close().await;
    }
}

/// How a game ended from the client's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEnd {
    Finished { winner_name: String, text: String },
    OpponentLeft(String),
}

/// Decides where to shoot next.
#[async_trait::async_trait]
pub trait Strategy: Send {
    /// Called with both grids of every board update.
    fn observe(&mut self, own_board: &[Vec<Cell>], opponent_board: &[Vec<Cell>]);

    /// Target for the current turn, as zero-based (row, col).
    async fn choose_target(&mut self) -> anyhow::Result<(usize, usize)>;
}

/// Picks uniformly among cells it has not targeted yet.
#[derive(Debug)]
pub struct RandomBot<R> {
    rng: R,
    view: Vec<Vec<Cell>>,
    moves: usize,
}

impl<R: Rng + Send> RandomBot<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            view: Vec::new(),
            moves: 0,
        }
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    fn untried(&self) -> Vec<(usize, usize)> {
        self.view
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, cell)| !cell.is_resolved())
                    .map(move |(c, _)| (r, c))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl<R: Rng + Send> Strategy for RandomBot<R> {
    fn observe(&mut self, _own_board: &[Vec<Cell>], opponent_board: &[Vec<Cell>]) {
        self.view = opponent_board.to_vec();
    }

    async fn choose_target(&mut self) -> anyhow::Result<(usize, usize)> {
        let target = self
            .untried()
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no untried cells left"))?;
        self.moves += 1;
        Ok(target)
    }
}

/// Parse a move such as `A5` or `j10`: a column letter, then a row counted
/// from 1. Returns zero-based (row, col).
pub fn parse_coord(input: &str, board_size: usize) -> Result<(usize, usize), String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Empty input".to_string());
    }
    let last_col = column_letter(board_size.saturating_sub(1));
    let mut chars = input.chars();
    let col_ch = chars
        .next()
        .ok_or("No column letter")?
        .to_ascii_uppercase();
    if !col_ch.is_ascii_uppercase() {
        return Err(format!(
            "Invalid column '{}' - must be a letter A-{}",
            col_ch, last_col
        ));
    }
    let col = (col_ch as u8 - b'A') as usize;
    if col >= board_size {
        return Err(format!(
            "Column '{}' out of bounds - must be A-{}",
            col_ch, last_col
        ));
    }
    let row_str = chars.as_str();
    if row_str.is_empty() {
        return Err("Too short - need column letter and row number (e.g., A5)".to_string());
    }
    let row: usize = row_str.parse().map_err(|_| {
        format!(
            "Invalid row '{}' - must be a number 1-{}",
            row_str, board_size
        )
    })?;
    if row == 0 || row > board_size {
        return Err(format!(
            "Row {} out of bounds - must be 1-{}",
            row, board_size
        ));
    }
    Ok((row - 1, col))
}

/// A person typing moves. Prompts go to `output`; boards are logged.
pub struct HumanPlayer<I, W> {
    input: I,
    output: W,
    board_size: usize,
}

impl HumanPlayer<BufReader<Stdin>, Stdout> {
    /// Read moves from the terminal.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<I, W> HumanPlayer<I, W>
where
    I: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: I, output: W) -> Self {
        Self {
            input,
            output,
            board_size: BOARD_SIZE,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Ask for a display name; an empty answer gives `fallback`.
    pub async fn ask_name(&mut self, fallback: &str) -> anyhow::Result<String> {
        let answer = self.prompt("Enter your username: ").await?;
        let name = answer.trim();
        Ok(if name.is_empty() {
            fallback.to_string()
        } else {
            name.to_string()
        })
    }

    async fn prompt(&mut self, text: &str) -> anyhow::Result<String> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            anyhow::bail!("input closed");
        }
        Ok(line)
    }

    async fn say(&mut self, text: &str) -> anyhow::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<I, W> Strategy for HumanPlayer<I, W>
where
    I: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn observe(&mut self, own_board: &[Vec<Cell>], opponent_board: &[Vec<Cell>]) {
        if !own_board.is_empty() {
            self.board_size = own_board.len();
        }
        info!("Your board:\n{}", Grid(own_board));
        info!("Opponent's board:\n{}", Grid(opponent_board));
    }

    async fn choose_target(&mut self) -> anyhow::Result<(usize, usize)> {
        loop {
            let line = self.prompt("Enter your move (e.g., A5): ").await?;
            match parse_coord(&line, self.board_size) {
                Ok(target) => return Ok(target),
                Err(e) => self.say(&e).await?,
            }
        }
    }
}
