use foundation::math::{LonLat, Projection, Vec2};
use foundation::{Aabb2, GeoBounds};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: i64, y: i64, z: u8) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// What the host map widget tells the renderer about the current view.
///
/// Pixel coordinates are "world pixels" at the current zoom: the origin is
/// the north-west corner of the tile pyramid and `y` grows downward.
pub trait MapView {
    fn projection(&self) -> Projection;
    fn zoom(&self) -> u8;
    fn tile_size(&self) -> u32;

    /// Currently visible area.
    fn viewport(&self) -> GeoBounds;

    /// World pixels per normalized world unit.
    fn world_size_px(&self) -> f64 {
        self.tile_size() as f64 * 2f64.powi(self.zoom() as i32)
    }

    fn project(&self, p: LonLat) -> Vec2 {
        self.projection().to_world(p).scale(self.world_size_px())
    }

    fn unproject(&self, px: Vec2) -> LonLat {
        self.projection()
            .from_world(px.scale(1.0 / self.world_size_px()))
    }

    /// Tile rows at the current zoom.
    fn tile_rows(&self) -> i64 {
        let rows = self.projection().world_extent().y * 2f64.powi(self.zoom() as i32);
        (rows.ceil() as i64).max(1)
    }

    /// Tile containing a world pixel, and the pixel's offset inside it.
    fn tile_at(&self, px: Vec2) -> (TileCoord, Vec2) {
        let size = self.tile_size() as f64;
        let t = px.scale(1.0 / size).floor();
        let tile = TileCoord::new(t.x as i64, t.y as i64, self.zoom());
        (tile, px - t.scale(size))
    }

    /// Tile extent in normalized world units.
    fn tile_world_bounds(&self, tile: TileCoord) -> Aabb2 {
        let s = self.tile_size() as f64 / self.world_size_px();
        Aabb2::new(
            [tile.x as f64 * s, tile.y as f64 * s],
            [(tile.x + 1) as f64 * s, (tile.y + 1) as f64 * s],
        )
    }
}

/// A plain tiled view: a projection, a zoom level and a viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledView {
    pub projection: Projection,
    pub zoom: u8,
    pub tile_size: u32,
    pub viewport: GeoBounds,
}

impl TiledView {
    pub fn new(projection: Projection, zoom: u8, tile_size: u32) -> Self {
        Self {
            projection,
            zoom,
            tile_size,
            viewport: GeoBounds::world(),
        }
    }

    pub fn with_viewport(mut self, viewport: GeoBounds) -> Self {
        self.viewport = viewport;
        self
    }
}

impl MapView for TiledView {
    fn projection(&self) -> Projection {
        self.projection
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn viewport(&self) -> GeoBounds {
        self.viewport
    }
}
