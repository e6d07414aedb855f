//! Grid A* over a lattice laid on the map extent
//!
//! Cells are `node_size` squares starting at `origin`. A cell is blocked when
//! an obstacle shape overlaps the cell shrunk by a small edge buffer. Static
//! answers are memoized behind a lock so one `PathFinder` can be shared by
//! worker threads; per-query search state lives on the caller's stack.

use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::RwLock;

use glam::Vec2;

use super::bounds::Bounds;
use super::collider::{Collider, Shape};

/// Orthogonal step cost
pub const STRAIGHT_COST: u32 = 10;
/// Diagonal step cost
pub const DIAGONAL_COST: u32 = 14;
/// Total shrink of a cell before the obstacle test, split across both sides
pub const EDGE_BUFFER: f32 = 2.0;

pub type Cell = (usize, usize);

/// A shape placed in the world that blocks the cells it covers
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub shape: Shape,
    pub position: Vec2,
}

impl Obstacle {
    pub fn new(shape: Shape, position: Vec2) -> Self {
        Self { shape, position }
    }

    pub fn from_collider(collider: &Collider) -> Self {
        Self::new(collider.shape.clone(), collider.position)
    }

    fn blocks(&self, cell: &Bounds) -> bool {
        self.shape.intersects_bounds(self.position, cell)
    }
}

/// Octile distance between two cells
pub fn octile_distance(a: Cell, b: Cell) -> u32 {
    let dx = a.0.abs_diff(b.0) as u32;
    let dy = a.1.abs_diff(b.1) as u32;
    DIAGONAL_COST * dx.min(dy) + STRAIGHT_COST * (dx.max(dy) - dx.min(dy))
}

#[derive(Debug, Clone, Copy)]
struct Node {
    g: u32,
    h: u32,
    parent: Option<Cell>,
    obstacle: bool,
}

#[derive(Debug)]
pub struct PathFinder {
    node_size: f32,
    origin: Vec2,
    width: f32,
    height: f32,
    grid_x: usize,
    grid_y: usize,
    obstacles: Vec<Obstacle>,
    marked: HashSet<Cell>,
    static_cache: RwLock<HashMap<Cell, bool>>,
}

impl PathFinder {
    /// Grid covering `width` x `height` world units from `origin` (top-left)
    pub fn new(node_size: f32, width: f32, height: f32, origin: Vec2) -> Self {
        let node_size = node_size.max(f32::EPSILON);
        Self {
            node_size,
            origin,
            width,
            height,
            grid_x: ((width / node_size) as usize).max(1),
            grid_y: ((height / node_size) as usize).max(1),
            obstacles: Vec::new(),
            marked: HashSet::new(),
            static_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn node_size(&self) -> f32 {
        self.node_size
    }

    /// Grid dimensions in cells
    pub fn grid_size(&self) -> (usize, usize) {
        (self.grid_x, self.grid_y)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Register a static obstacle. Invalidates the memoized grid.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
        self.write_cache().clear();
    }

    /// Block a cell directly, independent of any shape
    pub fn mark_obstacle(&mut self, cell: Cell) {
        self.marked.insert(cell);
    }

    /// World bounds of a cell
    pub fn cell_bounds(&self, (x, y): Cell) -> Bounds {
        Bounds::new(
            self.origin.x + x as f32 * self.node_size,
            self.origin.y + y as f32 * self.node_size,
            self.node_size,
            self.node_size,
        )
    }

    /// World position of a cell's center; waypoints use this
    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        self.cell_bounds(cell).center()
    }

    /// Map a world position to its grid cell.
    ///
    /// Positions are nudged toward the far edge in proportion to how far they
    /// sit across the grid, then scaled onto `[0, len - 1]` and rounded, so
    /// a cell center always maps back to its own cell.
    pub fn cell_of(&self, position: Vec2) -> Cell {
        let local = position - self.origin;
        (
            Self::axis_index(local.x, self.width, self.node_size, self.grid_x),
            Self::axis_index(local.y, self.height, self.node_size, self.grid_y),
        )
    }

    fn axis_index(local: f32, total: f32, node_size: f32, len: usize) -> usize {
        let half = node_size / 2.0;
        let across = local / (total / 2.0);
        let percent = ((local + half * across - half) / total).clamp(0.0, 1.0);
        ((len - 1) as f32 * percent).round() as usize
    }

    /// Whether a cell is blocked by a marked cell or a static obstacle
    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.is_blocked(cell, &[])
    }

    fn is_blocked(&self, cell: Cell, dynamic: &[Obstacle]) -> bool {
        if self.marked.contains(&cell) || self.is_static_obstacle(cell) {
            return true;
        }
        if dynamic.is_empty() {
            return false;
        }
        let area = self.buffered_bounds(cell);
        dynamic.iter().any(|o| o.blocks(&area))
    }

    fn is_static_obstacle(&self, cell: Cell) -> bool {
        if let Some(&hit) = self.read_cache().get(&cell) {
            return hit;
        }
        let area = self.buffered_bounds(cell);
        let hit = self.obstacles.iter().any(|o| o.blocks(&area));
        self.write_cache().insert(cell, hit);
        hit
    }

    fn buffered_bounds(&self, cell: Cell) -> Bounds {
        // Tiny grids still need a positive cell after shrinking
        let inset = (EDGE_BUFFER / 2.0).min(self.node_size / 4.0);
        self.cell_bounds(cell).inflate(-inset)
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Cell, bool>> {
        self.static_cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Cell, bool>> {
        self.static_cache.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Path between two world positions using static obstacles only
    pub fn request_path(&self, start: Vec2, goal: Vec2) -> Vec<Vec2> {
        self.request_path_with(start, goal, &[])
    }

    /// A* from `start` to `goal`.
    ///
    /// Waypoints are cell centers ordered goal first, ending next to the start
    /// cell (the start itself is not included). The goal cell is always
    /// treated as open. If no route exists the result is `[goal]`.
    pub fn request_path_with(&self, start: Vec2, goal: Vec2, dynamic: &[Obstacle]) -> Vec<Vec2> {
        let start_cell = self.cell_of(start);
        let goal_cell = self.cell_of(goal);

        let mut nodes: HashMap<Cell, Node> = HashMap::new();
        let mut closed: HashSet<Cell> = HashSet::new();
        let mut open = BinaryHeap::new();

        let h = octile_distance(start_cell, goal_cell);
        nodes.insert(
            start_cell,
            Node {
                g: 0,
                h,
                parent: None,
                obstacle: false,
            },
        );
        open.push(Reverse((h, h, start_cell)));

        while let Some(Reverse((_, _, current))) = open.pop() {
            if !closed.insert(current) {
                continue;
            }

            if current == goal_cell {
                return self.retrace(&nodes, start_cell, goal_cell);
            }

            let current_g = nodes.get(&current).map_or(0, |n| n.g);
            for neighbor in self.neighbors(current) {
                if closed.contains(&neighbor) {
                    continue;
                }

                let node = match nodes.entry(neighbor) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => e.insert(Node {
                        g: u32::MAX,
                        h: 0,
                        parent: None,
                        obstacle: neighbor != goal_cell && self.is_blocked(neighbor, dynamic),
                    }),
                };
                if node.obstacle {
                    continue;
                }

                let g = current_g + octile_distance(current, neighbor);
                if g < node.g {
                    node.g = g;
                    node.h = octile_distance(neighbor, goal_cell);
                    node.parent = Some(current);
                    open.push(Reverse((g + node.h, node.h, neighbor)));
                }
            }
        }

        log::debug!(
            "pathfinder: no route from {:?} to {:?}, falling back to goal",
            start_cell,
            goal_cell
        );
        vec![goal]
    }

    fn neighbors(&self, (x, y): Cell) -> impl Iterator<Item = Cell> + '_ {
        (-1i64..=1)
            .flat_map(|dx| (-1i64..=1).map(move |dy| (dx, dy)))
            .filter(|&d| d != (0, 0))
            .filter_map(move |(dx, dy)| {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                (nx >= 0 && ny >= 0 && (nx as usize) < self.grid_x && (ny as usize) < self.grid_y)
                    .then_some((nx as usize, ny as usize))
            })
    }

    fn retrace(&self, nodes: &HashMap<Cell, Node>, start: Cell, goal: Cell) -> Vec<Vec2> {
        let mut path = Vec::new();
        let mut current = goal;
        while current != start {
            path.push(self.cell_center(current));
            match nodes.get(&current).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path
    }
}
