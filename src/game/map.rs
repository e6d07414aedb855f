//! Tile map: tile registry, collider placement and floor rendering
//!
//! Tile `(row, col)` is centered at `(col * tw - W / 2, row * th - H / 2)`,
//! so the map spans `[-W/2 - tw/2, W/2 - tw/2]` horizontally (same for Y).

use std::collections::HashMap;

use glam::Vec2;

use super::camera::Viewport;
use super::render::RenderSurface;
use crate::error::{SetupError, SetupResult};
use crate::sim::{Bounds, Collider, ColliderId, ColliderWorld, CollisionGroup, GroupMask, Shape};

/// Rows/columns rendered past the viewport edge by default
pub const DEFAULT_RENDER_OFFSET: (i32, i32) = (2, 2);

/// Position of a tile on the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLocation {
    pub row: u32,
    pub column: u32,
}

impl TileLocation {
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

#[derive(Debug, Clone)]
struct TileDef {
    location: TileLocation,
    rotation_degrees: i32,
    colliders: Vec<Collider>,
}

/// Split a text grid into rows of tile ids. Blank lines are skipped.
pub fn parse_string_matrix(text: &str, separator: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split(separator)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct TileMap {
    tiles: HashMap<String, TileDef>,
    matrix: Vec<Vec<String>>,
    tile_width: f32,
    tile_height: f32,
    tile_sheet: Option<String>,
    viewport: Option<Viewport>,
    render_offset: (i32, i32),
    boundary_thickness: f32,
    placed: Vec<ColliderId>,
}

impl TileMap {
    pub fn new(tile_width: f32, tile_height: f32) -> Self {
        Self {
            tiles: HashMap::new(),
            matrix: Vec::new(),
            tile_width,
            tile_height,
            tile_sheet: None,
            viewport: None,
            render_offset: DEFAULT_RENDER_OFFSET,
            boundary_thickness: 100.0,
            placed: Vec::new(),
        }
    }

    pub fn set_tile_sheet(&mut self, image: impl Into<String>) {
        self.tile_sheet = Some(image.into());
    }

    pub fn tile_sheet(&self) -> Option<&str> {
        self.tile_sheet.as_deref()
    }

    pub fn set_boundary_thickness(&mut self, thickness: f32) {
        self.boundary_thickness = thickness;
    }

    pub fn set_render_offset(&mut self, columns: i32, rows: i32) {
        self.render_offset = (columns, rows);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    pub fn register_tile(&mut self, id: &str, location: TileLocation, rotation_degrees: i32) {
        self.tiles.insert(
            id.to_string(),
            TileDef {
                location,
                rotation_degrees,
                colliders: Vec::new(),
            },
        );
    }

    /// Attach a collider template to a registered tile. The template becomes an
    /// immovable map tile; a clone is placed on every cell using the tile.
    pub fn register_collider_to_tile(&mut self, id: &str, mut collider: Collider) -> SetupResult<()> {
        let tile = self
            .tiles
            .get_mut(id)
            .ok_or_else(|| SetupError::UnknownTile(id.to_string()))?;
        collider.set_static(true);
        collider.group = CollisionGroup::MapTiles;
        collider.mask = GroupMask::ALL
            .without(CollisionGroup::MapTiles)
            .without(CollisionGroup::MapBounds);
        tile.colliders.push(collider);
        Ok(())
    }

    /// Install the tile grid. Every id must be registered and rows must be equal length.
    pub fn set_matrix(&mut self, matrix: Vec<Vec<String>>) -> SetupResult<()> {
        let expected = matrix.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(SetupError::EmptyMap);
        }
        for (row, tiles) in matrix.iter().enumerate() {
            if tiles.len() != expected {
                return Err(SetupError::RaggedMap {
                    row,
                    expected,
                    found: tiles.len(),
                });
            }
            if let Some(unknown) = tiles.iter().find(|id| !self.tiles.contains_key(*id)) {
                return Err(SetupError::UnknownTile(unknown.clone()));
            }
        }
        self.matrix = matrix;
        Ok(())
    }

    pub fn set_matrix_str(&mut self, text: &str, separator: &str) -> SetupResult<()> {
        self.set_matrix(parse_string_matrix(text, separator))
    }

    pub fn rows(&self) -> usize {
        self.matrix.len()
    }

    pub fn columns(&self) -> usize {
        self.matrix.first().map_or(0, Vec::len)
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> f32 {
        self.tile_height
    }

    pub fn total_width(&self) -> f32 {
        self.columns() as f32 * self.tile_width
    }

    pub fn total_height(&self) -> f32 {
        self.rows() as f32 * self.tile_height
    }

    pub fn tile_x(&self, column: usize) -> f32 {
        column as f32 * self.tile_width - self.total_width() / 2.0
    }

    pub fn tile_y(&self, row: usize) -> f32 {
        row as f32 * self.tile_height - self.total_height() / 2.0
    }

    /// Center of a tile in world space
    pub fn tile_center(&self, row: usize, column: usize) -> Vec2 {
        Vec2::new(self.tile_x(column), self.tile_y(row))
    }

    /// World rectangle covered by the tiles
    pub fn extent(&self) -> Bounds {
        Bounds::new(
            -self.total_width() / 2.0 - self.tile_width / 2.0,
            -self.total_height() / 2.0 - self.tile_height / 2.0,
            self.total_width(),
            self.total_height(),
        )
    }

    fn tile(&self, row: usize, column: usize) -> Option<&TileDef> {
        let id = self.matrix.get(row)?.get(column)?;
        self.tiles.get(id)
    }

    /// Whether a tile carries no colliders
    pub fn is_open(&self, row: usize, column: usize) -> bool {
        self.tile(row, column).is_some_and(|t| t.colliders.is_empty())
    }

    /// Center of the open tile closest to `position`, if any
    pub fn nearest_open_tile(&self, position: Vec2) -> Option<Vec2> {
        (0..self.rows())
            .flat_map(|r| (0..self.columns()).map(move |c| (r, c)))
            .filter(|&(r, c)| self.is_open(r, c))
            .map(|(r, c)| self.tile_center(r, c))
            .min_by(|a, b| a.distance_squared(position).total_cmp(&b.distance_squared(position)))
    }

    /// Colliders this map placed in the world
    pub fn placed_colliders(&self) -> &[ColliderId] {
        &self.placed
    }

    /// Add boundary walls and every tile collider to `world`.
    ///
    /// Returns clones of the placed tile colliders (walls excluded), in world
    /// space, for line-of-sight and path-finder obstacles.
    pub fn initialize_colliders(&mut self, world: &mut ColliderWorld) -> Vec<Collider> {
        for wall in self.boundary_walls() {
            self.placed.push(world.add(wall));
        }

        let mut tiles = Vec::new();
        for (row, ids) in self.matrix.iter().enumerate() {
            for (column, id) in ids.iter().enumerate() {
                let Some(def) = self.tiles.get(id) else {
                    continue;
                };
                let center = self.tile_center(row, column);
                for template in &def.colliders {
                    let collider = template.clone().at(center + template.position);
                    tiles.push(collider.clone());
                    self.placed.push(world.add(collider));
                }
            }
        }
        tiles
    }

    /// Four static walls of `boundary_thickness` enclosing the map
    fn boundary_walls(&self) -> [Collider; 4] {
        let w = self.total_width();
        let h = self.total_height();
        let t = self.boundary_thickness;
        let (tw, th) = (self.tile_width, self.tile_height);
        let mask = GroupMask::ALL
            .without(CollisionGroup::MapTiles)
            .without(CollisionGroup::MapBounds);

        let wall = |shape: Shape, position: Vec2| {
            Collider::with_shape(shape)
                .at(position)
                .in_group(CollisionGroup::MapBounds, mask)
                .into_static()
        };

        [
            wall(Shape::rect(t, h + t * 2.0), Vec2::new(-w / 2.0 - t / 2.0 - tw / 2.0, -th / 2.0)),
            wall(Shape::rect(t, h + t * 2.0), Vec2::new(w / 2.0 + t / 2.0 - tw / 2.0, -th / 2.0)),
            wall(Shape::rect(w + t * 2.0, t), Vec2::new(-tw / 2.0, -h / 2.0 - t / 2.0 - th / 2.0)),
            wall(Shape::rect(w + t * 2.0, t), Vec2::new(-tw / 2.0, h / 2.0 + t / 2.0 - th / 2.0)),
        ]
    }

    /// Row/column ranges to draw for the current viewport (half-open)
    fn visible_range(&self) -> ((usize, usize), (usize, usize)) {
        let Some(v) = self.viewport else {
            return ((0, self.rows()), (0, self.columns()));
        };
        let (off_x, off_y) = self.render_offset;
        let index = |edge: f32, total: f32, size: f32| ((edge + total / 2.0) / size).floor() as i32;

        let row_start = index(v.top, self.total_height(), self.tile_height) + 2 - off_y;
        let row_end = index(v.bottom, self.total_height(), self.tile_height) + off_y;
        let col_start = index(v.left, self.total_width(), self.tile_width) + 2 - off_x;
        let col_end = index(v.right, self.total_width(), self.tile_width) + off_x;

        let clamp = |start: i32, end: i32, len: usize| {
            let start = start.max(0) as usize;
            let end = (end.max(0) as usize).min(len);
            (start.min(end), end)
        };
        (
            clamp(row_start, row_end, self.rows()),
            clamp(col_start, col_end, self.columns()),
        )
    }

    /// Draw the floor tiles that intersect the viewport
    pub fn render(&self, surface: &mut dyn RenderSurface) -> SetupResult<()> {
        let sheet = self.tile_sheet.as_deref().ok_or(SetupError::MissingTileSheet)?;
        let ((row_start, row_end), (col_start, col_end)) = self.visible_range();
        let (tw, th) = (self.tile_width, self.tile_height);

        for row in row_start..row_end {
            for column in col_start..col_end {
                let Some(def) = self.tile(row, column) else {
                    continue;
                };
                surface.save();
                surface.translate(self.tile_center(row, column));
                surface.rotate((def.rotation_degrees as f32).to_radians());
                surface.draw_image(
                    sheet,
                    Some(Bounds::new(
                        def.location.column as f32 * tw,
                        def.location.row as f32 * th,
                        tw,
                        th,
                    )),
                    Bounds::new(-tw / 2.0, -th / 2.0, tw, th),
                );
                surface.restore();
            }
        }
        Ok(())
    }

    /// Built-in demo map: a small city block grid with solid buildings
    pub fn city() -> SetupResult<Self> {
        let mut map = TileMap::new(32.0, 32.0);
        map.set_tile_sheet("city_tiles");
        map.register_tile(".", TileLocation::new(0, 0), 0);
        map.register_tile("=", TileLocation::new(0, 1), 0);
        map.register_tile("|", TileLocation::new(0, 1), 90);
        map.register_tile("+", TileLocation::new(0, 2), 0);
        map.register_tile("#", TileLocation::new(1, 0), 0);
        map.register_collider_to_tile("#", Collider::with_shape(Shape::rect(32.0, 32.0)))?;
        map.set_matrix_str(CITY_LAYOUT, " ")?;
        Ok(map)
    }
}

const CITY_LAYOUT: &str = "
. . . . . | . . . . . . | . . . . . . | . . . . .
. # # # . | . # # # # . | . # # . # . | . # # # .
. # # # . | . # # # # . | . # # . # . | . # # # .
. . . . . | . . . . . . | . . . . . . | . . . . .
= = = = = + = = = = = = + = = = = = = + = = = = =
. . . . . | . . . . . . | . . . . . . | . . . . .
. # # . . | . # . . # . | . # # # # . | . . # # .
. # # . . | . # . . # . | . . . . . . | . . # # .
. . . . . | . . . . . . | . . . . . . | . . . . .
= = = = = + = = = = = = + = = = = = = + = = = = =
. . . . . | . . . . . . | . . . . . . | . . . . .
. # # # . | . # # . # . | . # . . # . | . # . # .
. # # # . | . # # . # . | . # . . # . | . # . # .
. . . . . | . . . . . . | . . . . . . | . . . . .
= = = = = + = = = = = = + = = = = = = + = = = = =
. . . . . | . . . . . . | . . . . . . | . . . . .
. # . # . | . # # # # . | . # # # . . | . # # # .
. . . . . | . . . . . . | . . . . . . | . . . . .
";
