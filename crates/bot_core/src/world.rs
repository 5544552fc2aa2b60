//! World grid model and configuration reconciliation.

use crate::{CellState, GridPos, WorldConfig, WorldGrid};

impl WorldConfig {
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    pub fn start_pos(&self) -> GridPos {
        GridPos {
            x: self.start_x,
            y: self.start_y,
        }
    }
}

impl WorldGrid {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![CellState::Empty; (width * height) as usize],
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| (y as u32 * self.width + x as u32) as usize)
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<CellState> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Out-of-bounds reads as non-obstacle; bounds are checked separately
    /// by the interpreter.
    pub fn is_obstacle(&self, x: i32, y: i32) -> bool {
        self.cell(x, y) == Some(CellState::Obstacle)
    }

    /// Flips one in-bounds cell between empty and obstacle. Out-of-bounds
    /// is a no-op returning false.
    pub fn toggle_obstacle(&mut self, x: i32, y: i32) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        self.cells[index] = match self.cells[index] {
            CellState::Empty => CellState::Obstacle,
            CellState::Obstacle => CellState::Empty,
        };
        true
    }

    pub fn set_obstacle(&mut self, x: i32, y: i32) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        self.cells[index] = CellState::Obstacle;
        true
    }
}

/// Reconciles the world into a new configuration:
/// 1. clamp the start pose into the new bounds,
/// 2. allocate an all-empty grid of the new dimensions,
/// 3. copy obstacles over the overlapping rectangle,
/// 4. force the start cell empty (the robot never starts on an obstacle).
///
/// Idempotent when the configuration is unchanged.
pub fn apply_resize(
    old_config: &WorldConfig,
    old_grid: &WorldGrid,
    new_config: &WorldConfig,
) -> (WorldConfig, WorldGrid) {
    let max_x = (new_config.width as i32 - 1).max(0);
    let max_y = (new_config.height as i32 - 1).max(0);
    let config = WorldConfig {
        start_x: new_config.start_x.clamp(0, max_x),
        start_y: new_config.start_y.clamp(0, max_y),
        ..*new_config
    };

    let mut grid = WorldGrid::empty(config.width, config.height);
    let overlap_w = old_config.width.min(config.width) as i32;
    let overlap_h = old_config.height.min(config.height) as i32;
    for y in 0..overlap_h {
        for x in 0..overlap_w {
            if old_grid.is_obstacle(x, y) {
                grid.set_obstacle(x, y);
            }
        }
    }

    if grid.is_obstacle(config.start_x, config.start_y) {
        grid.toggle_obstacle(config.start_x, config.start_y);
    }

    (config, grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;

    fn config(width: u32, height: u32, start_x: i32, start_y: i32) -> WorldConfig {
        WorldConfig {
            width,
            height,
            start_x,
            start_y,
            start_direction: Direction::Right,
        }
    }

    #[test]
    fn toggle_flips_and_flips_back() {
        let mut grid = WorldGrid::empty(3, 3);
        assert!(grid.toggle_obstacle(1, 1));
        assert!(grid.is_obstacle(1, 1));
        assert!(grid.toggle_obstacle(1, 1));
        assert!(!grid.is_obstacle(1, 1));
    }

    #[test]
    fn toggle_out_of_bounds_is_a_noop() {
        let mut grid = WorldGrid::empty(3, 3);
        let before = grid.clone();
        assert!(!grid.toggle_obstacle(-1, 0));
        assert!(!grid.toggle_obstacle(3, 0));
        assert_eq!(grid, before);
    }

    #[test]
    fn out_of_bounds_is_not_an_obstacle() {
        let grid = WorldGrid::empty(2, 2);
        assert!(!grid.is_obstacle(-1, -1));
        assert!(!grid.is_obstacle(5, 0));
    }

    #[test]
    fn resize_drops_obstacles_outside_overlap_and_keeps_the_rest() {
        let old = config(10, 10, 0, 0);
        let mut grid = WorldGrid::empty(10, 10);
        grid.set_obstacle(9, 9);
        grid.set_obstacle(2, 2);

        let (_, new_grid) = apply_resize(&old, &grid, &config(5, 5, 0, 0));
        assert!(!new_grid.is_obstacle(9, 9), "outside the overlap");
        assert!(new_grid.is_obstacle(2, 2), "inside the overlap");
    }

    #[test]
    fn resize_clamps_start_pose_into_bounds() {
        let old = config(10, 10, 9, 9);
        let grid = WorldGrid::empty(10, 10);
        let (new_config, _) = apply_resize(&old, &grid, &config(5, 5, 9, 9));
        assert_eq!((new_config.start_x, new_config.start_y), (4, 4));
    }

    #[test]
    fn resize_forces_start_cell_empty() {
        let old = config(10, 10, 0, 0);
        let mut grid = WorldGrid::empty(10, 10);
        grid.set_obstacle(3, 3);
        let (_, new_grid) = apply_resize(&old, &grid, &config(10, 10, 3, 3));
        assert!(!new_grid.is_obstacle(3, 3));
    }

    #[test]
    fn resize_is_idempotent_for_identical_config() {
        let cfg = config(6, 4, 2, 1);
        let mut grid = WorldGrid::empty(6, 4);
        grid.set_obstacle(5, 3);
        let (cfg_1, grid_1) = apply_resize(&cfg, &grid, &cfg);
        let (cfg_2, grid_2) = apply_resize(&cfg_1, &grid_1, &cfg_1);
        assert_eq!(cfg_1, cfg_2);
        assert_eq!(grid_1, grid_2);
    }

    #[test]
    fn resize_to_one_by_one_does_not_panic() {
        let old = config(10, 10, 5, 5);
        let grid = WorldGrid::empty(10, 10);
        let (new_config, new_grid) = apply_resize(&old, &grid, &config(1, 1, 5, 5));
        assert_eq!((new_config.start_x, new_config.start_y), (0, 0));
        assert_eq!(new_grid.cells.len(), 1);
    }
}
