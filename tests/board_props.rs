use std::collections::HashSet;

use broadside::{
    AttackOutcome, Board, BoardError, Cell, GameRules, Grid, MoveError, Orientation, BOARD_SIZE,
    SHIP_LENGTHS, TOTAL_SHIP_CELLS,
};
use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn random_board(seed: u64) -> Board {
    let mut rng = SmallRng::seed_from_u64(seed);
    Board::random_fleet(&GameRules::default(), &mut rng).unwrap()
}

/// Ship placements must be in bounds, straight, contiguous and disjoint.
fn assert_valid_fleet(board: &Board, rules: &GameRules) {
    let mut seen = HashSet::new();
    let mut lengths: Vec<usize> = Vec::new();
    for placement in board.placements() {
        let cells: Vec<_> = placement.cells().collect();
        assert_eq!(cells.len(), placement.length());
        let (r0, c0) = placement.origin();
        for (i, &(r, c)) in cells.iter().enumerate() {
            assert!(r < board.size() && c < board.size());
            match placement.orientation() {
                Orientation::Horizontal => assert_eq!((r, c), (r0, c0 + i)),
                Orientation::Vertical => assert_eq!((r, c), (r0 + i, c0)),
            }
            assert!(seen.insert((r, c)), "overlap at ({}, {})", r, c);
            assert_eq!(board.get(r, c), Some(Cell::Ship));
        }
        lengths.push(placement.length());
    }
    assert_eq!(lengths, rules.ship_lengths);
    assert_eq!(board.count(Cell::Ship), rules.total_ship_cells());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_fleet_is_valid(seed in any::<u64>()) {
        let board = random_board(seed);
        prop_assert_eq!(board.placements().len(), SHIP_LENGTHS.len());
        prop_assert_eq!(board.count(Cell::Ship), TOTAL_SHIP_CELLS);
        prop_assert_eq!(board.count(Cell::Water), BOARD_SIZE * BOARD_SIZE - TOTAL_SHIP_CELLS);
        assert_valid_fleet(&board, &GameRules::default());
    }

    #[test]
    fn same_seed_same_fleet(seed in any::<u64>()) {
        prop_assert_eq!(random_board(seed).rows(), random_board(seed).rows());
    }

    #[test]
    fn attack_is_idempotent(seed in any::<u64>(), row in 0..BOARD_SIZE, col in 0..BOARD_SIZE) {
        let mut board = random_board(seed);
        let before = board.get(row, col).unwrap();
        let outcome = board.attack(row, col).unwrap();
        match before {
            Cell::Ship => {
                prop_assert_eq!(outcome, AttackOutcome::Hit);
                prop_assert_eq!(board.get(row, col), Some(Cell::Hit));
            }
            Cell::Water => {
                prop_assert_eq!(outcome, AttackOutcome::Miss);
                prop_assert_eq!(board.get(row, col), Some(Cell::Miss));
            }
            other => prop_assert!(false, "fresh board holds {:?}", other),
        }

        let after = board.rows();
        prop_assert_eq!(
            board.attack(row, col),
            Err(MoveError::AlreadyAttacked { row, col })
        );
        prop_assert_eq!(board.rows(), after);
    }

    #[test]
    fn all_sunk_only_when_every_ship_cell_is_hit(seed in any::<u64>(), shots in 0..BOARD_SIZE * BOARD_SIZE) {
        let mut board = random_board(seed);
        let mut rng = SmallRng::seed_from_u64(seed ^ 0x5eed);
        for _ in 0..shots {
            let (r, c) = (rng.random_range(0..BOARD_SIZE), rng.random_range(0..BOARD_SIZE));
            let _ = board.attack(r, c);
        }
        prop_assert_eq!(board.all_sunk(), board.count(Cell::Ship) == 0);
        prop_assert_eq!(board.remaining_ship_cells(), board.count(Cell::Ship));
        prop_assert_eq!(board.count(Cell::Hit) + board.remaining_ship_cells(), TOTAL_SHIP_CELLS);
    }

    #[test]
    fn out_of_bounds_attack_changes_nothing(seed in any::<u64>(), row in BOARD_SIZE..40usize) {
        let mut board = random_board(seed);
        let before = board.rows();
        prop_assert!(matches!(board.attack(row, 0), Err(MoveError::OutOfBounds { .. })), "expected OutOfBounds");
        prop_assert!(matches!(board.attack(0, row), Err(MoveError::OutOfBounds { .. })), "expected OutOfBounds");
        prop_assert_eq!(board.rows(), before);
    }
}

#[test]
fn sinking_everything_sinks_the_fleet() {
    let mut board = random_board(11);
    let ships: Vec<_> = board.placements().iter().flat_map(|p| p.cells().collect::<Vec<_>>()).collect();
    for (i, &(r, c)) in ships.iter().enumerate() {
        assert!(!board.all_sunk());
        assert_eq!(board.attack(r, c), Ok(AttackOutcome::Hit));
        assert_eq!(board.remaining_ship_cells(), ships.len() - i - 1);
    }
    assert!(board.all_sunk());
}

#[test]
fn fallback_fleet_packs_the_standard_ships() {
    let rules = GameRules::default();
    let board = Board::fallback_fleet(&rules).unwrap();
    assert_valid_fleet(&board, &rules);
    // First fit puts the carrier at the top-left corner.
    assert_eq!(board.placements()[0].origin(), (0, 0));
    assert_eq!(board.placements()[0].orientation(), Orientation::Horizontal);
}

#[test]
fn tight_board_still_gets_a_full_fleet() {
    // Four ships of four on a 4x4 board leave no slack for random placement.
    let rules = GameRules {
        board_size: 4,
        ship_lengths: vec![4, 4, 4, 4],
    };
    let mut rng = SmallRng::seed_from_u64(5);
    let board = Board::random_fleet(&rules, &mut rng).unwrap();
    assert_valid_fleet(&board, &rules);
    assert_eq!(board.count(Cell::Water), 0);
}

#[test]
fn invalid_rules_are_rejected() {
    let mut rng = SmallRng::seed_from_u64(0);
    let cases = [
        GameRules { board_size: 0, ship_lengths: vec![2] },
        GameRules { board_size: 27, ship_lengths: vec![2] },
        GameRules { board_size: 10, ship_lengths: vec![] },
        GameRules { board_size: 10, ship_lengths: vec![0] },
        GameRules { board_size: 5, ship_lengths: vec![6] },
        GameRules { board_size: 3, ship_lengths: vec![3, 3, 3, 3] },
    ];
    for rules in cases {
        assert!(matches!(rules.validate(), Err(BoardError::InvalidRules(_))), "{:?}", rules);
        assert!(Board::random_fleet(&rules, &mut rng).is_err());
    }
}

#[test]
fn overlapping_placement_is_refused() {
    let mut board = Board::new(BOARD_SIZE);
    let first = broadside::Placement::new(3, 2, Orientation::Horizontal, 4, BOARD_SIZE).unwrap();
    board.place(first).unwrap();
    let crossing = broadside::Placement::new(1, 4, Orientation::Vertical, 4, BOARD_SIZE).unwrap();
    assert!(matches!(board.place(crossing), Err(BoardError::Overlaps)));
    assert_eq!(board.count(Cell::Ship), 4);
    assert!(matches!(
        broadside::Placement::new(8, 8, Orientation::Vertical, 3, BOARD_SIZE),
        Err(BoardError::OutOfBounds)
    ));
}

#[test]
fn grid_symbols_match_the_wire_rendering() {
    let mut board = Board::new(3);
    board
        .place(broadside::Placement::new(0, 0, Orientation::Horizontal, 2, 3).unwrap())
        .unwrap();
    board.attack(0, 0).unwrap();
    board.attack(2, 2).unwrap();
    let json = serde_json::to_string(&board.rows()).unwrap();
    assert_eq!(json, r#"[["X","S","~"],["~","~","~"],["~","~","O"]]"#);
    assert_eq!(board.to_string(), "   A B C\n 1 X S ~\n 2 ~ ~ ~\n 3 ~ ~ O\n");
    assert_eq!(Grid(&board.rows()).to_string(), board.to_string());
}
