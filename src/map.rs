//! Map topology: segment generation, path tracing, and fog of war.
//!
//! A segment is stamped from one of five fixed ASCII patterns. `#` cells
//! form the walkable path, `.` cells are filled with random scenery tiles
//! from the segment's environment theme. The path is traced with a
//! deterministic nearest-neighbor walk, so patterns must describe a simple
//! 4-connected path whose row-major-first cell is an endpoint. Pattern
//! validation is a content-time concern, not a tick-time one.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::RngBundle;

/// Walkable path marker in pattern strings.
pub const PATTERN_PATH: char = '#';
/// Open terrain marker in pattern strings.
pub const PATTERN_OPEN: char = '.';

/// Fixed entry point of the very first segment, as `(x, y)`.
pub const FIRST_SEGMENT_ENTRY: (usize, usize) = (7, 2);
/// Column range of the always-visible area around the first entry.
pub const ENTRY_VISIBLE_X: (usize, usize) = (6, 8);
/// Row range of the always-visible area around the first entry.
pub const ENTRY_VISIBLE_Y: (usize, usize) = (0, 2);

/// The fixed segment layouts. Pattern 0 is reserved for the first segment;
/// later segments pick uniformly among the others, never repeating the
/// immediately preceding choice.
pub const MAP_PATTERNS: [&str; 5] = [
    "...............\n\
     ...............\n\
     .......#.......\n\
     .......#.......\n\
     .#######.......\n\
     .#.............\n\
     .#############.\n\
     .............#.\n\
     ##############.\n\
     ...............",
    "##############.\n\
     .............#.\n\
     .#############.\n\
     .#.............\n\
     .#############.\n\
     .............#.\n\
     .#############.\n\
     .#.............\n\
     .#############.\n\
     ...............",
    "#..............\n\
     #..............\n\
     #####..........\n\
     ....#..........\n\
     ....#####......\n\
     ........#......\n\
     ........#####..\n\
     ............#..\n\
     ............###\n\
     ..............#",
    "#####..........\n\
     ....#..........\n\
     ....##########.\n\
     .............#.\n\
     ##############.\n\
     #..............\n\
     ##############.\n\
     .............#.\n\
     .........#####.\n\
     ...............",
    "...#...........\n\
     ...#...........\n\
     ...########....\n\
     ..........#....\n\
     ...########....\n\
     ...#...........\n\
     ...###########.\n\
     .............#.\n\
     ......########.\n\
     ...............",
];

/// Errors raised when a map pattern violates the simple-path contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern {pattern} contains no path cells")]
    NoPathCells { pattern: usize },
    #[error("pattern {pattern} path is broken: traced {traced} of {total} cells")]
    BrokenPath {
        pattern: usize,
        traced: usize,
        total: usize,
    },
    #[error("pattern 0 is missing its fixed entry point")]
    MissingEntry,
    #[error("pattern {pattern} contains glyph {glyph:?}")]
    UnknownGlyph { pattern: usize, glyph: char },
}

/// Environment theme applied to a segment's scenery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentTheme {
    Desert,
    Mountain,
    Forest,
    City,
}

impl EnvironmentTheme {
    pub const ALL: [Self; 4] = [Self::Desert, Self::Mountain, Self::Forest, Self::City];

    /// Scenery tile pool for this theme.
    #[must_use]
    pub const fn tiles(self) -> &'static [&'static str] {
        match self {
            Self::Desert => &["🟨", "🌵"],
            Self::Mountain => &["⛰️", "🏔", "🌋", "🗻"],
            Self::Forest => &["🌳", "🌲", "🌱", "🌿"],
            Self::City => &[
                "🏡", "🏟", "🏢", "🏤", "🏥", "🏦", "🏨", "🏪", "🏫", "🏬", "🏭", "🏗",
            ],
        }
    }
}

/// A single background cell of a segment grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Path,
    Terrain(&'static str),
}

/// A generated world segment: scenery grid plus an ordered walkable path.
/// Immutable once generated; segments are regenerated (not persisted) on
/// load from the same seeded theme stream.
#[derive(Debug, Clone)]
pub struct MapSegment {
    pub index: usize,
    pub pattern_index: usize,
    pub theme: EnvironmentTheme,
    pub grid: Vec<Vec<Cell>>,
    pub path: Vec<(usize, usize)>,
}

impl MapSegment {
    /// Stamp a segment from a pattern, drawing theme and tiles from the
    /// theme RNG stream. The first segment always uses the desert theme.
    #[must_use]
    pub fn generate(
        index: usize,
        pattern_index: usize,
        previous_theme: Option<EnvironmentTheme>,
        rng: &RngBundle,
    ) -> Self {
        let theme = if index == 0 {
            EnvironmentTheme::Desert
        } else {
            pick_theme(previous_theme, rng)
        };

        let pattern = MAP_PATTERNS[pattern_index.min(MAP_PATTERNS.len() - 1)];
        let mut grid = Vec::new();
        for row in pattern.lines() {
            let mut cells = Vec::new();
            for glyph in row.trim().chars() {
                if glyph == PATTERN_PATH {
                    cells.push(Cell::Path);
                } else {
                    let tiles = theme.tiles();
                    let tile = tiles[rng.theme().gen_range(0..tiles.len())];
                    cells.push(Cell::Terrain(tile));
                }
            }
            grid.push(cells);
        }

        let entry = if index == 0 {
            Some(FIRST_SEGMENT_ENTRY)
        } else {
            None
        };
        let path = trace_path(&grid, entry);

        Self {
            index,
            pattern_index,
            theme,
            grid,
            path,
        }
    }

    /// Number of path steps in this segment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.path.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Fog-of-war check. A cell is visible when it falls in the fixed entry
    /// area of the first segment, or inside the 3x3 neighborhood of any
    /// path step at or below `furthest_step`. Revealed cells never
    /// un-reveal because `furthest_step` is monotonic.
    #[must_use]
    pub fn is_visible(&self, x: usize, y: usize, furthest_step: Option<usize>) -> bool {
        if self.index == 0
            && (ENTRY_VISIBLE_X.0..=ENTRY_VISIBLE_X.1).contains(&x)
            && (ENTRY_VISIBLE_Y.0..=ENTRY_VISIBLE_Y.1).contains(&y)
        {
            return true;
        }
        let Some(furthest) = furthest_step else {
            return false;
        };
        self.path
            .iter()
            .take(furthest.saturating_add(1))
            .any(|&(px, py)| px.abs_diff(x) <= 1 && py.abs_diff(y) <= 1)
    }
}

fn pick_theme(previous: Option<EnvironmentTheme>, rng: &RngBundle) -> EnvironmentTheme {
    let candidates: Vec<EnvironmentTheme> = EnvironmentTheme::ALL
        .into_iter()
        .filter(|theme| Some(*theme) != previous)
        .collect();
    candidates[rng.theme().gen_range(0..candidates.len())]
}

/// Deterministic nearest-neighbor walk over the path cells. Starts at the
/// row-major-first node (or the fixed entry for segment 0) and repeatedly
/// steps to the unvisited 4-adjacent neighbor; stops when none remains.
fn trace_path(grid: &[Vec<Cell>], entry: Option<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut nodes: Vec<(usize, usize)> = Vec::new();
    for (y, row) in grid.iter().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            if *cell == Cell::Path {
                nodes.push((x, y));
            }
        }
    }
    if nodes.is_empty() {
        return Vec::new();
    }
    nodes.sort_by_key(|&(x, y)| (y, x));

    let mut current = nodes[0];
    if let Some(entry) = entry
        && nodes.contains(&entry)
    {
        current = entry;
    }

    let mut path = Vec::with_capacity(nodes.len());
    let mut visited = vec![false; nodes.len()];
    loop {
        if let Some(pos) = nodes.iter().position(|&n| n == current) {
            visited[pos] = true;
        }
        path.push(current);

        let (cx, cy) = current;
        let neighbors = [
            (cx, cy.wrapping_sub(1)),
            (cx, cy + 1),
            (cx.wrapping_sub(1), cy),
            (cx + 1, cy),
        ];
        let next = neighbors.into_iter().find(|candidate| {
            nodes
                .iter()
                .position(|n| n == candidate)
                .is_some_and(|pos| !visited[pos])
        });
        match next {
            Some(step) => current = step,
            None => break,
        }
    }
    path
}

/// Offline content validation for every fixed pattern: each must be a
/// non-empty simple path fully covered by the trace, built from known
/// glyphs, and pattern 0 must carry the fixed entry point.
pub fn validate_patterns() -> Result<(), PatternError> {
    for (pattern_index, pattern) in MAP_PATTERNS.iter().enumerate() {
        let mut grid = Vec::new();
        let mut total = 0usize;
        for row in pattern.lines() {
            let mut cells = Vec::new();
            for glyph in row.trim().chars() {
                match glyph {
                    PATTERN_PATH => {
                        total += 1;
                        cells.push(Cell::Path);
                    }
                    PATTERN_OPEN => cells.push(Cell::Terrain("")),
                    other => {
                        return Err(PatternError::UnknownGlyph {
                            pattern: pattern_index,
                            glyph: other,
                        });
                    }
                }
            }
            grid.push(cells);
        }
        if total == 0 {
            return Err(PatternError::NoPathCells {
                pattern: pattern_index,
            });
        }
        let entry = if pattern_index == 0 {
            let (ex, ey) = FIRST_SEGMENT_ENTRY;
            if grid
                .get(ey)
                .and_then(|row| row.get(ex))
                .is_none_or(|cell| *cell != Cell::Path)
            {
                return Err(PatternError::MissingEntry);
            }
            Some(FIRST_SEGMENT_ENTRY)
        } else {
            None
        };
        let traced = trace_path(&grid, entry).len();
        if traced != total {
            return Err(PatternError::BrokenPath {
                pattern: pattern_index,
                traced,
                total,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_fixed_patterns_validate() {
        validate_patterns().unwrap();
    }

    #[test]
    fn first_segment_starts_at_fixed_entry() {
        let rng = RngBundle::from_user_seed(5);
        let segment = MapSegment::generate(0, 0, None, &rng);
        assert_eq!(segment.path.first().copied(), Some(FIRST_SEGMENT_ENTRY));
        assert_eq!(segment.theme, EnvironmentTheme::Desert);
    }

    #[test]
    fn trace_covers_every_path_cell_of_each_pattern() {
        let rng = RngBundle::from_user_seed(11);
        for pattern_index in 0..MAP_PATTERNS.len() {
            let segment_index = if pattern_index == 0 { 0 } else { pattern_index };
            let segment = MapSegment::generate(segment_index, pattern_index, None, &rng);
            let expected = MAP_PATTERNS[pattern_index]
                .chars()
                .filter(|c| *c == PATTERN_PATH)
                .count();
            assert_eq!(segment.len(), expected, "pattern {pattern_index}");
        }
    }

    #[test]
    fn successive_themes_never_repeat() {
        let rng = RngBundle::from_user_seed(3);
        let mut previous = Some(EnvironmentTheme::Desert);
        for index in 1..24 {
            let segment = MapSegment::generate(index, 1 + index % 4, previous, &rng);
            assert_ne!(Some(segment.theme), previous);
            previous = Some(segment.theme);
        }
    }

    #[test]
    fn entry_area_is_always_visible_on_first_segment() {
        let rng = RngBundle::from_user_seed(9);
        let segment = MapSegment::generate(0, 0, None, &rng);
        assert!(segment.is_visible(7, 1, None));
        assert!(!segment.is_visible(0, 8, None));
    }

    #[test]
    fn visibility_expands_with_furthest_step_and_never_shrinks() {
        let rng = RngBundle::from_user_seed(9);
        let segment = MapSegment::generate(0, 0, None, &rng);
        let (tx, ty) = segment.path[segment.len() - 1];
        assert!(!segment.is_visible(tx, ty, Some(0)));
        assert!(segment.is_visible(tx, ty, Some(segment.len() - 1)));
        // Earlier cells stay revealed at the larger watermark.
        let (fx, fy) = segment.path[0];
        assert!(segment.is_visible(fx, fy, Some(segment.len() - 1)));
    }

    #[test]
    fn tiles_come_from_segment_theme() {
        let rng = RngBundle::from_user_seed(2);
        let segment = MapSegment::generate(0, 0, None, &rng);
        for row in &segment.grid {
            for cell in row {
                if let Cell::Terrain(tile) = cell {
                    assert!(EnvironmentTheme::Desert.tiles().contains(tile));
                }
            }
        }
    }
}
