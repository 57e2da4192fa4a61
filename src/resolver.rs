//! Drag-to-move resolution: converts a freeform pointer displacement into the
//! furthest legal discrete board move.
//!
//! Sliding-block pieces move in straight lines along one axis and cannot pass
//! through occupants. The resolver picks the dominant axis of the gesture,
//! rounds the requested displacement to whole cells and walks the corridor one
//! cell at a time, stopping at the first blocked step.

use crate::board::{BoardPiece, Puzzle};

/// The axis a drag gesture resolves to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DragAxis {
    /// Motion along the x axis.
    Horizontal,
    /// Motion along the y axis.
    Vertical,
}

/// Picks the dominant axis of a raw displacement.
///
/// Horizontal wins only with a strictly larger magnitude; ties resolve to
/// vertical.
#[inline]
#[must_use]
pub fn dominant_axis(dx: f32, dy: f32) -> DragAxis {
    if dx.abs() > dy.abs() {
        DragAxis::Horizontal
    } else {
        DragAxis::Vertical
    }
}

/// Resolves a drag gesture on `piece` into its final legal position.
///
/// `dx` and `dy` are the raw pointer displacement in cell units (fractional,
/// as converted by the active render scale). The returned `(x, y)` is the
/// furthest in-corridor cell the piece can legally reach toward the rounded
/// target; when nothing moves it equals the piece's current position and the
/// caller treats the gesture as a no-op.
///
/// There are no error conditions: worst case the start position comes back.
#[must_use]
pub fn resolve_drag(puzzle: &Puzzle, piece: &BoardPiece, dx: f32, dy: f32) -> (i32, i32) {
    let start = (piece.x, piece.y);

    let (axis, delta) = match dominant_axis(dx, dy) {
        DragAxis::Horizontal => (DragAxis::Horizontal, dx),
        DragAxis::Vertical => (DragAxis::Vertical, dy),
    };

    let target = delta.round() as i32;
    if target == 0 {
        return start;
    }
    let dir = target.signum();

    // Corridor scan: advance one cell at a time, halting at the first
    // blocked offset. The piece travels as far as the corridor allows and
    // never jumps an obstacle.
    let mut accepted = 0;
    for step in 1..=target.abs() {
        let offset = step * dir;
        let (cand_x, cand_y) = match axis {
            DragAxis::Horizontal => (piece.x + offset, piece.y),
            DragAxis::Vertical => (piece.x, piece.y + offset),
        };
        if !puzzle.is_cell_range_free(cand_x, cand_y, piece.w, piece.h, piece.id) {
            break;
        }
        accepted = offset;
    }

    match axis {
        DragAxis::Horizontal => (start.0 + accepted, start.1),
        DragAxis::Vertical => (start.0, start.1 + accepted),
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::PieceId;

    fn single_piece_board() -> Puzzle {
        Puzzle {
            width: 6,
            height: 6,
            pieces: vec![BoardPiece::new(PieceId::new(1), 0, 0, 1, 1, true)],
            goal: (5, 5),
        }
    }

    fn piece_one(puzzle: &Puzzle) -> &BoardPiece {
        puzzle.piece(PieceId::new(1)).unwrap()
    }

    #[test]
    fn unobstructed_drag_travels_the_full_request() {
        let puzzle = single_piece_board();
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 4.2, 0.3), (4, 0));
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 0.1, 3.6), (0, 4));
    }

    #[test]
    fn drag_clamps_at_the_board_edge() {
        let puzzle = single_piece_board();
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 9.0, 0.0), (5, 0));
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 0.0, -3.0), (0, 0));
    }

    #[test]
    fn obstruction_halts_the_corridor_scan() {
        let mut puzzle = single_piece_board();
        puzzle
            .pieces
            .push(BoardPiece::new(PieceId::new(2), 2, 0, 1, 1, false));
        // Requested 3 cells right, only 1 cell of corridor is free.
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 3.0, 0.0), (1, 0));
    }

    #[test]
    fn flush_neighbor_means_no_travel() {
        let mut puzzle = single_piece_board();
        puzzle
            .pieces
            .push(BoardPiece::new(PieceId::new(2), 1, 0, 1, 1, false));
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 3.0, 0.0), (0, 0));
    }

    #[test]
    fn tie_between_axes_resolves_to_vertical() {
        let puzzle = single_piece_board();
        assert_eq!(dominant_axis(2.0, 2.0), DragAxis::Vertical);
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 2.0, 2.0), (0, 2));
    }

    #[test]
    fn sub_half_cell_drag_rounds_to_no_move() {
        let puzzle = single_piece_board();
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 0.4, 0.0), (0, 0));
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 0.0, 0.49), (0, 0));
    }

    #[test]
    fn only_the_dominant_axis_moves() {
        let puzzle = single_piece_board();
        let (x, y) = resolve_drag(&puzzle, piece_one(&puzzle), 3.0, 1.4);
        assert_eq!((x, y), (3, 0));
    }

    #[test]
    fn wide_piece_respects_its_full_extent() {
        let mut puzzle = single_piece_board();
        puzzle.pieces[0] = BoardPiece::new(PieceId::new(1), 0, 0, 2, 2, true);
        puzzle
            .pieces
            .push(BoardPiece::new(PieceId::new(2), 3, 1, 1, 1, false));
        // The 2x2 body collides with the blocker at x=3 once offset by 2.
        assert_eq!(resolve_drag(&puzzle, piece_one(&puzzle), 4.0, 0.0), (1, 0));
    }

    #[test]
    fn result_is_always_a_legal_position() {
        let puzzle = crate::board::classic_fallback();
        for piece in &puzzle.pieces {
            for (dx, dy) in [(3.0, 0.0), (-3.0, 0.0), (0.0, 3.0), (0.0, -3.0)] {
                let (x, y) = resolve_drag(&puzzle, piece, dx, dy);
                assert!(
                    puzzle.is_cell_range_free(x, y, piece.w, piece.h, piece.id),
                    "piece {} resolved to illegal ({}, {})",
                    piece.id,
                    x,
                    y
                );
            }
        }
    }
}
