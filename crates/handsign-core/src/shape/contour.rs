//! Moore-neighbor boundary tracing.
//!
//! # Algorithm
//! 1. Start at the first foreground pixel of the bottom row (left to right).
//! 2. From the current pixel and search direction `d`, probe the eight
//!    neighbors in order `d, d+1, …, d+7 (mod 8)`. The first neighbor that
//!    is an edge pixel (foreground with a background 8-neighbor) becomes
//!    the current pixel.
//! 3. If `i` probes were skipped before the hit, the next search starts at
//!    `(d + i + 6) mod 8`: two steps counter-clockwise of the direction
//!    just moved, which keeps the walk against the boundary.
//! 4. Stop on returning to the start (closed contour) or when no neighbor
//!    qualifies (open boundary).
//!
//! Directions are clockwise on screen, starting north.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::image::{Mask, Point};

/// `(d_row, d_col)` for N, NE, E, SE, S, SW, W, NW.
pub const DIRECTIONS: [(i64, i64); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// Search direction used for the first step.
const INITIAL_DIRECTION: usize = 0;

/// Ordered closed boundary walk. On success the first and last points are
/// the same pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    /// Wrap an already-ordered point sequence.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Visited points, including the repeated start point at the end.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the walk returned to its start.
    pub fn is_closed(&self) -> bool {
        self.points.len() > 1 && self.points.first() == self.points.last()
    }
}

/// Whether `(row, col)` is foreground with at least one background
/// 8-neighbor. Positions outside the mask are background.
pub fn is_edge(mask: &Mask, row: i64, col: i64) -> bool {
    mask.is_foreground_signed(row, col)
        && DIRECTIONS
            .iter()
            .any(|&(dr, dc)| !mask.is_foreground_signed(row + dr, col + dc))
}

/// First foreground pixel of the bottom row, scanning left to right.
pub fn find_start(mask: &Mask) -> Option<Point> {
    let last = mask.height().checked_sub(1)?;
    (0..mask.width())
        .find(|&c| mask.is_foreground(last, c))
        .map(|c| Point::new(last, c))
}

/// Trace the outer boundary of the hand region.
///
/// Fails with [`AnalysisError::NoBoundary`] when the bottom row holds no
/// foreground, and with [`AnalysisError::OpenBoundary`] when the walk gets
/// stuck or runs past `4 × width × height` steps without closing.
pub fn trace(mask: &Mask) -> Result<Contour, AnalysisError> {
    let start = find_start(mask).ok_or(AnalysisError::NoBoundary)?;
    let max_steps = 4 * (mask.width() as usize) * (mask.height() as usize);

    let mut points = vec![start];
    let mut current = start;
    let mut direction = INITIAL_DIRECTION;

    for _ in 0..max_steps {
        let (next, skipped) = next_edge(mask, current, direction).ok_or_else(|| {
            tracing::debug!(at = %current, steps = points.len(), "boundary walk stuck");
            AnalysisError::OpenBoundary {
                steps: points.len(),
            }
        })?;
        direction = (direction + skipped + 6) % 8;
        points.push(next);
        if next == start {
            return Ok(Contour { points });
        }
        current = next;
    }

    tracing::warn!(steps = points.len(), "boundary walk exceeded step limit");
    Err(AnalysisError::OpenBoundary {
        steps: points.len(),
    })
}

fn next_edge(mask: &Mask, from: Point, direction: usize) -> Option<(Point, usize)> {
    (0..8).find_map(|i| {
        let (dr, dc) = DIRECTIONS[(direction + i) % 8];
        let row = from.row as i64 + dr;
        let col = from.col as i64 + dc;
        is_edge(mask, row, col).then(|| (Point::new(row as u32, col as u32), i))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn rect(width: u32, height: u32, rows: std::ops::RangeInclusive<u32>, cols: std::ops::RangeInclusive<u32>) -> Mask {
        Mask::from_fn(width, height, |r, c| rows.contains(&r) && cols.contains(&c))
    }

    fn edge_set(mask: &Mask) -> HashSet<Point> {
        (0..mask.height())
            .flat_map(|r| (0..mask.width()).map(move |c| Point::new(r, c)))
            .filter(|p| is_edge(mask, p.row as i64, p.col as i64))
            .collect()
    }

    #[test]
    fn test_is_edge_marks_exactly_rectangle_border() {
        let mask = rect(20, 16, 3..=10, 4..=12);
        let expected: HashSet<Point> = (3..=10)
            .flat_map(|r| (4..=12).map(move |c| Point::new(r, c)))
            .filter(|p| p.row == 3 || p.row == 10 || p.col == 4 || p.col == 12)
            .collect();
        assert_eq!(edge_set(&mask), expected);
    }

    #[test]
    fn test_rectangle_contour_is_closed_border_walk() {
        // 8 rows × 7 cols standing on the bottom row: 2·8 + 2·7 − 4 = 26.
        let mask = rect(14, 12, 4..=11, 3..=9);
        let contour = trace(&mask).unwrap();
        assert!(contour.is_closed());
        assert_eq!(contour.points()[0], Point::new(11, 3));
        assert_eq!(contour.len(), 26 + 1);

        let visited: HashSet<Point> = contour.points().iter().copied().collect();
        assert_eq!(visited.len(), 26);
        assert_eq!(visited, edge_set(&mask));
    }

    #[test]
    fn test_consecutive_points_are_8_adjacent() {
        let mask = Mask::from_fn(40, 30, |r, c| {
            let (dr, dc) = (r as i64 - 29, c as i64 - 20);
            dr * dr + dc * dc <= 144
        });
        let contour = trace(&mask).unwrap();
        assert!(contour.is_closed());
        for pair in contour.points().windows(2) {
            let dr = (pair[0].row as i64 - pair[1].row as i64).abs();
            let dc = (pair[0].col as i64 - pair[1].col as i64).abs();
            assert!(dr <= 1 && dc <= 1 && (dr, dc) != (0, 0));
        }
    }

    #[test]
    fn test_no_foreground_on_bottom_row() {
        let mask = rect(10, 10, 2..=5, 2..=5);
        assert_eq!(trace(&mask), Err(AnalysisError::NoBoundary));
    }

    #[test]
    fn test_single_pixel_is_open_boundary() {
        let mut mask = Mask::empty(5, 5);
        mask.set(4, 2, true);
        assert_eq!(trace(&mask), Err(AnalysisError::OpenBoundary { steps: 1 }));
    }
}
