#![allow(dead_code)]

use broadside::{
    Board, Cell, InMemoryTransport, Message, Orientation, Placement, Player, StatusKind,
    Transport, BOARD_SIZE, SHIP_LENGTHS,
};
use tokio::time::{timeout, Duration};

/// Standard fleet laid out on rows 0, 2, 4, 6, 8 (horizontal) or columns
/// 0, 2, 4, 6, 8 (vertical), each ship starting at the edge.
pub fn striped_fleet(orientation: Orientation) -> Board {
    let lanes = [0usize, 2, 4, 6, 8];
    let placements = SHIP_LENGTHS.iter().zip(lanes).map(|(&len, lane)| {
        let (row, col) = match orientation {
            Orientation::Horizontal => (lane, 0),
            Orientation::Vertical => (0, lane),
        };
        Placement::new(row, col, orientation, len, BOARD_SIZE).unwrap()
    });
    Board::from_placements(BOARD_SIZE, placements).unwrap()
}

/// Every cell holding a ship, in row-major order.
pub fn ship_cells(board: &Board) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    for r in 0..board.size() {
        for c in 0..board.size() {
            if board.get(r, c) == Some(Cell::Ship) {
                cells.push((r, c));
            }
        }
    }
    cells
}

/// A server-side player plus the client end of its connection.
pub fn connected_player(name: &str) -> (Player, InMemoryTransport) {
    let (server, client) = InMemoryTransport::labelled_pair(name, &format!("{name}-client"));
    (Player::with_name(Box::new(server), name), client)
}

pub async fn next(client: &mut InMemoryTransport) -> Message {
    timeout(Duration::from_secs(5), client.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("transport error")
        .expect("connection closed")
}

pub async fn expect_closed(client: &mut InMemoryTransport) {
    let end = timeout(Duration::from_secs(5), client.recv())
        .await
        .expect("timed out waiting for close")
        .expect("transport error");
    assert!(end.is_none(), "expected close, got {:?}", end);
}

pub async fn expect_status(client: &mut InMemoryTransport, expected: StatusKind) -> String {
    match next(client).await {
        Message::StatusUpdate { kind, text } if kind == expected => text,
        other => panic!("expected {:?}, got {:?}", expected, other),
    }
}

pub async fn expect_board_update(
    client: &mut InMemoryTransport,
) -> (Vec<Vec<Cell>>, Vec<Vec<Cell>>, String) {
    match next(client).await {
        Message::BoardUpdate {
            own_board,
            opponent_board,
            text,
        } => (own_board, opponent_board, text),
        other => panic!("expected board update, got {:?}", other),
    }
}

/// Consume the pairing notice and starting boards.
pub async fn expect_start(client: &mut InMemoryTransport) {
    expect_status(client, StatusKind::Paired).await;
    let (_, view, text) = expect_board_update(client).await;
    assert_eq!(text, "Game started. Here are your boards.");
    assert!(view.iter().flatten().all(|&c| c == Cell::Water));
}

pub async fn send_move(client: &mut InMemoryTransport, row: i64, col: i64) {
    client.send(&Message::Move { row, col }).await.unwrap();
}
