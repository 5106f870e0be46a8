use footprints::{FootprintId, FootprintSet, GeometryKind};
use foundation::Aabb2;
use foundation::math::{Vec2, signed_area2};

use crate::path::{PathKind, ProjectedPath};
use crate::view::{MapView, TileCoord};

/// A tile's footprint in world space plus the transform to tile pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileWindow {
    pub tile: TileCoord,
    /// Tile extent in normalized world units.
    pub bounds: Aabb2,
    /// Pixels per world unit.
    pub scale: f64,
    pub size_px: u32,
    /// World width when the projection wraps horizontally.
    pub wrap_width: Option<f64>,
}

impl TileWindow {
    pub fn new(view: &dyn MapView, tile: TileCoord) -> Self {
        let projection = view.projection();
        Self {
            tile,
            bounds: view.tile_world_bounds(tile),
            scale: view.world_size_px(),
            size_px: view.tile_size(),
            wrap_width: projection
                .splits_antimeridian()
                .then(|| projection.world_extent().x),
        }
    }

    pub fn to_local(&self, w: Vec2) -> Vec2 {
        Vec2::new(
            (w.x - self.bounds.min[0]) * self.scale,
            (w.y - self.bounds.min[1]) * self.scale,
        )
    }

    /// Tile bounds grown by `pad_fraction` of the tile size on each side.
    pub fn padded(&self, pad_fraction: f64) -> Aabb2 {
        self.bounds.expand(self.bounds.width() * pad_fraction)
    }
}

/// A footprint path that overlaps one tile, in tile pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub ordinal: usize,
    pub footprint: FootprintId,
    pub kind: PathKind,
    pub points: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
    /// `None` when no added/removed override is active.
    pub deemphasized: Option<bool>,
    /// Imagery tile this fragment is clipped into, if any.
    pub url: Option<String>,
}

impl Fragment {
    /// Outer ring followed by holes.
    pub fn rings(&self) -> Vec<&[Vec2]> {
        std::iter::once(self.points.as_slice())
            .chain(self.holes.iter().map(Vec::as_slice))
            .collect()
    }
}

/// Fragments of one footprint that overlap the padded tile.
///
/// In a wrapping projection a path hanging past either world edge is also
/// tested one world width over, so the overflow lands on the tile it wraps
/// onto. Orbit back-tracks keep only their first overlapping pass.
pub fn overlapping(
    ordinal: usize,
    id: &FootprintId,
    kind: GeometryKind,
    paths: &[ProjectedPath],
    window: &TileWindow,
    pad_fraction: f64,
) -> Vec<Fragment> {
    let padded = window.padded(pad_fraction);
    let shifts: Vec<f64> = match window.wrap_width {
        Some(w) => vec![0.0, -w, w],
        None => vec![0.0],
    };

    let mut hits: Vec<ProjectedPath> = Vec::new();
    for path in paths {
        for shift in &shifts {
            let b = &path.bounds;
            // Only geometry that actually hangs past a world edge wraps.
            let overflows = match window.wrap_width {
                Some(w) if *shift < 0.0 => b.max[0] > w,
                Some(_) if *shift > 0.0 => b.min[0] < 0.0,
                _ => true,
            };
            if !overflows {
                continue;
            }
            let moved = Aabb2::new([b.min[0] + shift, b.min[1]], [b.max[0] + shift, b.max[1]]);
            if moved.intersects(&padded) {
                hits.push(if *shift == 0.0 {
                    path.clone()
                } else {
                    path.translated(Vec2::new(*shift, 0.0))
                });
            }
        }
    }

    if kind == GeometryKind::OrbitBackTrack
        && let Some(first) = hits.iter().map(|p| p.part).min()
    {
        hits.retain(|p| p.part == first);
    }

    hits.into_iter()
        .map(|path| {
            let to_local = |ring: &[Vec2]| ring.iter().map(|p| window.to_local(*p)).collect::<Vec<_>>();
            let mut points = to_local(&path.points);
            let mut holes: Vec<Vec<Vec2>> = path.holes.iter().map(|h| to_local(h)).collect();
            if path.kind == PathKind::Area {
                orient(&mut points, true);
                for hole in &mut holes {
                    orient(hole, false);
                }
            }
            Fragment {
                ordinal,
                footprint: id.clone(),
                kind: path.kind,
                points,
                holes,
                deemphasized: None,
                url: None,
            }
        })
        .collect()
}

/// Outer rings run clockwise on screen, holes counter-clockwise, so nonzero
/// filling subtracts holes whatever the source vertex order.
fn orient(ring: &mut [Vec2], clockwise: bool) {
    let area = signed_area2(ring);
    if (area > 0.0) != clockwise && area != 0.0 {
        ring.reverse();
    }
}

/// Fragments of every footprint in the set for one tile, in set order, with
/// deemphasis applied. On the project page excluded footprints are dropped.
pub fn tile_fragments(
    set: &FootprintSet,
    projected: &[Vec<ProjectedPath>],
    window: &TileWindow,
    pad_fraction: f64,
    project_page: bool,
) -> Vec<Fragment> {
    let mut out = Vec::new();
    for (ordinal, footprint) in set.iter() {
        let Some(paths) = projected.get(ordinal) else {
            continue;
        };
        if project_page && set.is_excluded(&footprint.id) {
            continue;
        }
        let deemphasized = set.deemphasized(&footprint.id);
        for mut fragment in overlapping(
            ordinal,
            &footprint.id,
            footprint.kind(),
            paths,
            window,
            pad_fraction,
        ) {
            fragment.deemphasized = deemphasized;
            out.push(fragment);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{TileWindow, overlapping, tile_fragments};
    use crate::path::{PathKind, ProjectedPath};
    use crate::projector::project_footprint;
    use crate::view::{TileCoord, TiledView};
    use footprints::{Footprint, FootprintId, FootprintSet, GeometryKind, Spatial};
    use foundation::math::{Projection, Vec2, signed_area2};

    fn window(z: u8, x: i64, y: i64) -> TileWindow {
        let view = TiledView::new(Projection::Geographic, z, 256);
        TileWindow::new(&view, TileCoord::new(x, y, z))
    }

    fn area(points: Vec<Vec2>, holes: Vec<Vec<Vec2>>, part: usize) -> ProjectedPath {
        ProjectedPath::new(PathKind::Area, points, holes, part)
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x1, y0),
            Vec2::new(x1, y1),
            Vec2::new(x0, y1),
        ]
    }

    #[test]
    fn contained_polygon_yields_one_fragment_with_opposite_hole_winding() {
        let mut outer = square(0.1, 0.1, 0.3, 0.3);
        outer.reverse();
        let hole = square(0.15, 0.15, 0.2, 0.2);
        let paths = vec![area(outer, vec![hole], 0)];
        let id = FootprintId::from("A");

        let frags = overlapping(0, &id, GeometryKind::Polygon, &paths, &window(0, 0, 0), 0.1);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].points.len(), 4);
        assert!(signed_area2(&frags[0].points) > 0.0);
        assert!(signed_area2(&frags[0].holes[0]) < 0.0);
        // 0.1 world units at zoom 0 is 25.6 px.
        assert!(frags[0].points.iter().any(|p| (p.x - 25.6).abs() < 1e-9));
    }

    #[test]
    fn distant_paths_are_skipped_but_padding_admits_near_misses() {
        let id = FootprintId::from("A");
        // Tile (0,0) at zoom 2 spans [0, 0.25] world units.
        let near = vec![area(square(0.26, 0.1, 0.3, 0.2), vec![], 0)];
        let far = vec![area(square(0.4, 0.1, 0.45, 0.2), vec![], 0)];
        let w = window(2, 0, 0);
        assert_eq!(overlapping(0, &id, GeometryKind::Polygon, &near, &w, 0.1).len(), 1);
        assert!(overlapping(0, &id, GeometryKind::Polygon, &near, &w, 0.0).is_empty());
        assert!(overlapping(0, &id, GeometryKind::Polygon, &far, &w, 0.1).is_empty());
    }

    #[test]
    fn overflow_past_east_edge_wraps_to_first_column() {
        let id = FootprintId::from("R");
        let fp = Footprint::new("R", Spatial::Rectangles(vec!["-10 170 10 -170".into()]));
        let paths = project_footprint(&fp, Projection::Geographic, 2.0);

        // Zoom 1 geographic: two columns of half a world unit each.
        let west = overlapping(0, &id, GeometryKind::Rectangle, &paths, &window(1, 0, 0), 0.0);
        assert_eq!(west.len(), 1);
        assert!(west[0].points.iter().any(|p| p.x < 0.0));
        assert!(west[0].points.iter().any(|p| p.x > 0.0));

        let east = overlapping(0, &id, GeometryKind::Rectangle, &paths, &window(1, 1, 0), 0.0);
        assert_eq!(east.len(), 1);
    }

    #[test]
    fn orbit_keeps_first_overlapping_pass() {
        let id = FootprintId::from("O");
        let paths = vec![
            area(square(0.6, 0.1, 0.7, 0.2), vec![], 0),
            area(square(0.1, 0.1, 0.2, 0.2), vec![], 1),
            area(square(0.15, 0.1, 0.22, 0.2), vec![], 2),
        ];
        let frags = overlapping(0, &id, GeometryKind::OrbitBackTrack, &paths, &window(2, 0, 0), 0.1);
        assert_eq!(frags.len(), 1);
        assert!(frags[0].points.iter().any(|p| (p.x - 0.1 * 1024.0).abs() < 1e-9));
    }

    #[test]
    fn deemphasis_and_project_page_exclusion() {
        let fps: Vec<Footprint> = ["id1", "id2", "id3"]
            .iter()
            .map(|id| Footprint::new(*id, Spatial::Points(vec!["0 0".into()])))
            .collect();
        let set = FootprintSet::new(fps).with_overrides(vec!["id2".into()], vec![]);
        let projected: Vec<_> = set
            .iter()
            .map(|(_, f)| project_footprint(f, Projection::Geographic, 2.0))
            .collect();
        let w = window(0, 0, 0);

        let flags: Vec<_> = tile_fragments(&set, &projected, &w, 0.1, false)
            .iter()
            .map(|f| (f.ordinal, f.deemphasized))
            .collect();
        assert_eq!(flags, vec![(0, Some(true)), (1, Some(false)), (2, Some(true))]);

        let kept: Vec<_> = tile_fragments(&set, &projected, &w, 0.1, true)
            .iter()
            .map(|f| f.ordinal)
            .collect();
        assert_eq!(kept, vec![1]);
    }
}
