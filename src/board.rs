//! Pure board geometry: piece rectangles, occupancy tests and the solved test.
//!
//! Everything in this module is a pure function over an immutable [`Puzzle`]
//! value. The session state machine owns mutation; the board model only
//! answers questions.

use serde::{Deserialize, Serialize};

use crate::PieceId;

/// A single rectangular piece on the board.
///
/// Positions and sizes are in whole board cells. The `(x, y)` pair is the
/// top-left cell of the piece; `(w, h)` is its extent. At most one piece in a
/// puzzle carries `is_goal`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPiece {
    /// Identifier, unique within a puzzle.
    pub id: PieceId,
    /// Column of the top-left cell.
    pub x: i32,
    /// Row of the top-left cell.
    pub y: i32,
    /// Width in cells (≥ 1).
    pub w: i32,
    /// Height in cells (≥ 1).
    pub h: i32,
    /// Whether this is the distinguished piece that must reach the goal cell.
    pub is_goal: bool,
}

impl BoardPiece {
    /// Creates a new piece.
    #[must_use]
    pub const fn new(id: PieceId, x: i32, y: i32, w: i32, h: i32, is_goal: bool) -> Self {
        Self {
            id,
            x,
            y,
            w,
            h,
            is_goal,
        }
    }

    /// Axis-aligned rectangle intersection against another rectangle.
    ///
    /// `overlap ⟺ !(ax2≤bx1 ∨ ax1≥bx2 ∨ ay2≤by1 ∨ ay1≥by2)`
    #[inline]
    #[must_use]
    pub const fn overlaps_rect(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        !(self.x + self.w <= x || self.x >= x + w || self.y + self.h <= y || self.y >= y + h)
    }
}

/// Reasons a puzzle layout fails validation.
///
/// Returned by [`Puzzle::validate`]. The session treats any of these on a
/// generated puzzle as a generation failure and substitutes the canned
/// fallback layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LayoutError {
    /// Board dimensions must both be at least one cell.
    BadDimensions {
        /// Board width in cells.
        width: i32,
        /// Board height in cells.
        height: i32,
    },
    /// A piece has a non-positive width or height.
    DegeneratePiece {
        /// The offending piece.
        piece: PieceId,
    },
    /// A piece extends past the board edge.
    OutOfBounds {
        /// The offending piece.
        piece: PieceId,
    },
    /// Two pieces occupy a common cell.
    Overlap {
        /// First piece of the overlapping pair.
        first: PieceId,
        /// Second piece of the overlapping pair.
        second: PieceId,
    },
    /// Two pieces share the same identifier.
    DuplicateId {
        /// The duplicated identifier.
        piece: PieceId,
    },
    /// The puzzle must carry exactly one goal piece.
    GoalCount {
        /// How many goal pieces were found.
        count: usize,
    },
    /// The goal cell lies outside the board.
    GoalOutOfBounds {
        /// Goal column.
        x: i32,
        /// Goal row.
        y: i32,
    },
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::BadDimensions { width, height } => {
                write!(f, "board dimensions {}x{} are invalid", width, height)
            }
            LayoutError::DegeneratePiece { piece } => {
                write!(f, "piece {} has a non-positive extent", piece)
            }
            LayoutError::OutOfBounds { piece } => {
                write!(f, "piece {} extends past the board edge", piece)
            }
            LayoutError::Overlap { first, second } => {
                write!(f, "pieces {} and {} overlap", first, second)
            }
            LayoutError::DuplicateId { piece } => {
                write!(f, "piece id {} appears more than once", piece)
            }
            LayoutError::GoalCount { count } => {
                write!(f, "expected exactly one goal piece, found {}", count)
            }
            LayoutError::GoalOutOfBounds { x, y } => {
                write!(f, "goal cell ({}, {}) lies outside the board", x, y)
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// An immutable sliding-block puzzle: board bounds, pieces and the goal cell.
///
/// The win condition is the goal piece's top-left cell reaching [`Puzzle::goal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    /// Board width in cells (≥ 1).
    pub width: i32,
    /// Board height in cells (≥ 1).
    pub height: i32,
    /// The pieces, in no particular order.
    pub pieces: Vec<BoardPiece>,
    /// The cell the goal piece's top-left corner must reach.
    pub goal: (i32, i32),
}

impl Puzzle {
    /// Looks up a piece by id.
    #[must_use]
    pub fn piece(&self, id: PieceId) -> Option<&BoardPiece> {
        self.pieces.iter().find(|p| p.id == id)
    }

    /// Returns the goal-bearing piece, if present.
    #[must_use]
    pub fn goal_piece(&self) -> Option<&BoardPiece> {
        self.pieces.iter().find(|p| p.is_goal)
    }

    /// Tests whether the rectangle `(x, y, w, h)` is free for a piece to
    /// occupy.
    ///
    /// Returns `false` when the rectangle exits the board bounds or overlaps
    /// any piece other than `exclude` (the piece being moved excludes itself
    /// from the collision test).
    #[must_use]
    pub fn is_cell_range_free(&self, x: i32, y: i32, w: i32, h: i32, exclude: PieceId) -> bool {
        if x < 0 || y < 0 || x + w > self.width || y + h > self.height {
            return false;
        }
        self.pieces
            .iter()
            .filter(|p| p.id != exclude)
            .all(|p| !p.overlaps_rect(x, y, w, h))
    }

    /// True iff the goal piece's top-left cell equals the goal cell.
    ///
    /// Insensitive to the order of pieces in the collection. A puzzle without
    /// a goal piece is never solved.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.goal_piece()
            .is_some_and(|p| (p.x, p.y) == self.goal)
    }

    /// Checks every layout invariant: positive dimensions, unique ids, pieces
    /// in bounds and pairwise non-overlapping, exactly one goal piece, goal
    /// cell in bounds.
    ///
    /// # Errors
    ///
    /// The first violated invariant, as a [`LayoutError`].
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.width < 1 || self.height < 1 {
            return Err(LayoutError::BadDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let (gx, gy) = self.goal;
        if gx < 0 || gy < 0 || gx >= self.width || gy >= self.height {
            return Err(LayoutError::GoalOutOfBounds { x: gx, y: gy });
        }
        for (i, p) in self.pieces.iter().enumerate() {
            if p.w < 1 || p.h < 1 {
                return Err(LayoutError::DegeneratePiece { piece: p.id });
            }
            if p.x < 0 || p.y < 0 || p.x + p.w > self.width || p.y + p.h > self.height {
                return Err(LayoutError::OutOfBounds { piece: p.id });
            }
            for other in &self.pieces[i + 1..] {
                if other.id == p.id {
                    return Err(LayoutError::DuplicateId { piece: p.id });
                }
                if p.overlaps_rect(other.x, other.y, other.w, other.h) {
                    return Err(LayoutError::Overlap {
                        first: p.id,
                        second: other.id,
                    });
                }
            }
        }
        let goal_count = self.pieces.iter().filter(|p| p.is_goal).count();
        if goal_count != 1 {
            return Err(LayoutError::GoalCount { count: goal_count });
        }
        Ok(())
    }
}

/// The canned fallback puzzle used when the external generator fails.
///
/// This is the classic 4×5 Klotski opening: the 2×2 goal piece starts at
/// (1, 0) and must slide to the goal cell (1, 3), surrounded by four 1×2
/// verticals, one 2×1 horizontal and four 1×1 singles. Two cells at the
/// bottom center start free.
#[must_use]
pub fn classic_fallback() -> Puzzle {
    Puzzle {
        width: 4,
        height: 5,
        pieces: vec![
            BoardPiece::new(PieceId::new(1), 1, 0, 2, 2, true),
            BoardPiece::new(PieceId::new(2), 0, 0, 1, 2, false),
            BoardPiece::new(PieceId::new(3), 3, 0, 1, 2, false),
            BoardPiece::new(PieceId::new(4), 0, 2, 1, 2, false),
            BoardPiece::new(PieceId::new(5), 3, 2, 1, 2, false),
            BoardPiece::new(PieceId::new(6), 1, 2, 2, 1, false),
            BoardPiece::new(PieceId::new(7), 1, 3, 1, 1, false),
            BoardPiece::new(PieceId::new(8), 2, 3, 1, 1, false),
            BoardPiece::new(PieceId::new(9), 0, 4, 1, 1, false),
            BoardPiece::new(PieceId::new(10), 3, 4, 1, 1, false),
        ],
        goal: (1, 3),
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

    fn bare_board(width: i32, height: i32) -> Puzzle {
        Puzzle {
            width,
            height,
            pieces: Vec::new(),
            goal: (0, 0),
        }
    }

    #[test]
    fn out_of_bounds_rect_is_occupied_for_every_board_size() {
        for width in 1..6 {
            for height in 1..6 {
                let puzzle = bare_board(width, height);
                let id = PieceId::new(99);
                assert!(!puzzle.is_cell_range_free(-1, 0, 1, 1, id));
                assert!(!puzzle.is_cell_range_free(0, -1, 1, 1, id));
                assert!(!puzzle.is_cell_range_free(width, 0, 1, 1, id));
                assert!(!puzzle.is_cell_range_free(0, height, 1, 1, id));
                assert!(!puzzle.is_cell_range_free(width - 1, 0, 2, 1, id));
                assert!(!puzzle.is_cell_range_free(0, height - 1, 1, 2, id));
            }
        }
    }

    #[test]
    fn in_bounds_empty_rect_is_free() {
        let puzzle = bare_board(4, 5);
        assert!(puzzle.is_cell_range_free(0, 0, 4, 5, PieceId::new(1)));
    }

    #[test]
    fn occupied_rect_is_not_free() {
        let mut puzzle = bare_board(4, 5);
        puzzle
            .pieces
            .push(BoardPiece::new(PieceId::new(1), 1, 1, 2, 2, false));
        assert!(!puzzle.is_cell_range_free(0, 0, 2, 2, PieceId::new(2)));
        assert!(puzzle.is_cell_range_free(0, 0, 1, 1, PieceId::new(2)));
        // The piece itself is excluded from the collision test.
        assert!(puzzle.is_cell_range_free(1, 1, 2, 2, PieceId::new(1)));
    }

    #[test]
    fn edge_touching_rects_do_not_overlap() {
        let a = BoardPiece::new(PieceId::new(1), 0, 0, 2, 2, false);
        assert!(!a.overlaps_rect(2, 0, 1, 1));
        assert!(!a.overlaps_rect(0, 2, 1, 1));
        assert!(a.overlaps_rect(1, 1, 1, 1));
    }

    #[test]
    fn solved_test_matches_goal_position() {
        let mut puzzle = classic_fallback();
        assert!(!puzzle.is_solved());
        for piece in &mut puzzle.pieces {
            if piece.is_goal {
                piece.x = 1;
                piece.y = 3;
            }
        }
        assert!(puzzle.is_solved());
    }

    #[test]
    fn solved_test_is_order_insensitive() {
        let mut puzzle = classic_fallback();
        for piece in &mut puzzle.pieces {
            if piece.is_goal {
                piece.x = 1;
                piece.y = 3;
            }
        }
        puzzle.pieces.reverse();
        assert!(puzzle.is_solved());
    }

    #[test]
    fn fallback_layout_is_valid() {
        let puzzle = classic_fallback();
        assert!(puzzle.validate().is_ok());
        assert_eq!(puzzle.pieces.len(), 10);
        let goal = puzzle.goal_piece().unwrap();
        assert_eq!((goal.x, goal.y, goal.w, goal.h), (1, 0, 2, 2));
        assert_eq!(puzzle.goal, (1, 3));
    }

    #[test]
    fn fallback_leaves_two_free_cells() {
        let puzzle = classic_fallback();
        let covered: i32 = puzzle.pieces.iter().map(|p| p.w * p.h).sum();
        assert_eq!(covered, 18);
        let probe = PieceId::new(99);
        assert!(puzzle.is_cell_range_free(1, 4, 1, 1, probe));
        assert!(puzzle.is_cell_range_free(2, 4, 1, 1, probe));
    }

    #[test]
    fn validate_rejects_overlap() {
        let puzzle = Puzzle {
            width: 4,
            height: 4,
            pieces: vec![
                BoardPiece::new(PieceId::new(1), 0, 0, 2, 2, true),
                BoardPiece::new(PieceId::new(2), 1, 1, 2, 2, false),
            ],
            goal: (0, 0),
        };
        assert_eq!(
            puzzle.validate(),
            Err(LayoutError::Overlap {
                first: PieceId::new(1),
                second: PieceId::new(2),
            })
        );
    }

    #[test]
    fn validate_rejects_out_of_bounds_piece() {
        let puzzle = Puzzle {
            width: 3,
            height: 3,
            pieces: vec![BoardPiece::new(PieceId::new(1), 2, 2, 2, 1, true)],
            goal: (0, 0),
        };
        assert_eq!(
            puzzle.validate(),
            Err(LayoutError::OutOfBounds {
                piece: PieceId::new(1)
            })
        );
    }

    #[test]
    fn validate_rejects_missing_goal() {
        let puzzle = Puzzle {
            width: 3,
            height: 3,
            pieces: vec![BoardPiece::new(PieceId::new(1), 0, 0, 1, 1, false)],
            goal: (2, 2),
        };
        assert_eq!(puzzle.validate(), Err(LayoutError::GoalCount { count: 0 }));
    }

    #[test]
    fn validate_rejects_duplicate_id() {
        let puzzle = Puzzle {
            width: 4,
            height: 4,
            pieces: vec![
                BoardPiece::new(PieceId::new(1), 0, 0, 1, 1, true),
                BoardPiece::new(PieceId::new(1), 2, 2, 1, 1, false),
            ],
            goal: (3, 3),
        };
        assert_eq!(
            puzzle.validate(),
            Err(LayoutError::DuplicateId {
                piece: PieceId::new(1)
            })
        );
    }
}
