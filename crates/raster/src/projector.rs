//! Geometry Projector: footprint shapes to world-space paths.
//!
//! Geodetic lines and polygons follow great circles, densified at a fixed
//! angular step. In the geographic projection they are then split at the
//! antimeridian so every piece stays inside `[-180, 180]`. Cartesian shapes
//! connect their vertices with straight segments in lon/lat and are never
//! split; neither are rectangles, whose crossing east edge is carried past
//! 180 and wrapped by the clipper instead.

use foundation::math::{
    LonLat, Projection, Vec2, densify_great_circle, signed_area2, unwrap_lons,
};
use footprints::{Footprint, Interpolation, Shape};
use tracing::warn;

use crate::path::{PathKind, ProjectedPath};

const WEST_EDGE: f64 = -180.0;
const EAST_EDGE: f64 = 180.0;

type Piece = (Vec<LonLat>, Vec<Vec<LonLat>>);

/// Projects every shape of a footprint. Malformed coordinates log a warning
/// and yield no paths.
pub fn project_footprint(
    footprint: &Footprint,
    projection: Projection,
    max_step_deg: f64,
) -> Vec<ProjectedPath> {
    let shapes = match footprint.shapes() {
        Ok(shapes) => shapes,
        Err(e) => {
            warn!(footprint = %footprint.id, error = %e, "malformed footprint geometry");
            return Vec::new();
        }
    };

    let geodetic = footprint.interpolation == Interpolation::Geodetic;
    let split = geodetic && projection.splits_antimeridian();
    let to_world = |ring: &[LonLat]| -> Vec<Vec2> {
        ring.iter().map(|p| projection.to_world(*p)).collect()
    };

    let mut out = Vec::new();
    for (part, shape) in shapes.iter().enumerate() {
        match shape {
            Shape::Point(p) => {
                out.push(ProjectedPath::new(
                    PathKind::Point,
                    vec![projection.to_world(*p)],
                    Vec::new(),
                    part,
                ));
            }
            Shape::Rectangle(b) => {
                let ring = interpolate(&b.unwrapped_corners(), false, true, projection, max_step_deg);
                out.push(ProjectedPath::new(PathKind::Area, to_world(&ring), Vec::new(), part));
            }
            Shape::Line(points) => {
                let line = interpolate(points, geodetic, false, projection, max_step_deg);
                let pieces = if split { split_line(&line) } else { vec![line] };
                for piece in pieces.iter().filter(|p| p.len() >= 2) {
                    out.push(ProjectedPath::new(PathKind::Line, to_world(piece), Vec::new(), part));
                }
            }
            Shape::Polygon(rings) => {
                let Some((outer, holes)) = rings.split_first() else {
                    continue;
                };
                let outer = interpolate(outer, geodetic, true, projection, max_step_deg);
                let holes: Vec<Vec<LonLat>> = holes
                    .iter()
                    .map(|h| interpolate(h, geodetic, true, projection, max_step_deg))
                    .collect();

                let pieces = if split {
                    split_polygon(outer, holes)
                } else {
                    vec![(outer, holes)]
                };
                for (outer, holes) in pieces {
                    out.push(ProjectedPath::new(
                        PathKind::Area,
                        to_world(&outer),
                        holes.iter().map(|h| to_world(h)).collect(),
                        part,
                    ));
                }
            }
        }
    }
    out
}

fn interpolate(
    points: &[LonLat],
    geodetic: bool,
    closed: bool,
    projection: Projection,
    max_step_deg: f64,
) -> Vec<LonLat> {
    if geodetic {
        unwrap_lons(&densify_great_circle(points, max_step_deg.to_radians(), closed))
    } else if projection.splits_antimeridian() {
        points.to_vec()
    } else {
        densify_linear(points, max_step_deg, closed)
    }
}

/// Straight lon/lat segments, subdivided so curved projections bend them.
fn densify_linear(points: &[LonLat], max_step_deg: f64, closed: bool) -> Vec<LonLat> {
    let mut out = Vec::with_capacity(points.len());
    for (i, a) in points.iter().enumerate() {
        out.push(*a);
        let b = if i + 1 < points.len() {
            points[i + 1]
        } else if closed && points.len() > 2 {
            points[0]
        } else {
            continue;
        };
        let span = (b.lon_deg - a.lon_deg).abs().max((b.lat_deg - a.lat_deg).abs());
        if !(max_step_deg > 0.0) || span <= max_step_deg {
            continue;
        }
        let steps = (span / max_step_deg - 1e-9).ceil() as usize;
        for s in 1..steps {
            let t = s as f64 / steps as f64;
            out.push(LonLat::new(
                a.lon_deg + (b.lon_deg - a.lon_deg) * t,
                a.lat_deg + (b.lat_deg - a.lat_deg) * t,
            ));
        }
    }
    out
}

fn shifted(ring: &[LonLat], by: f64) -> Vec<LonLat> {
    ring.iter()
        .map(|p| LonLat::new(p.lon_deg + by, p.lat_deg))
        .collect()
}

fn lon_range(ring: &[LonLat]) -> (f64, f64) {
    ring.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.lon_deg), hi.max(p.lon_deg))
    })
}

/// Shifts `ring` by whole turns so its first vertex lies within 180 degrees
/// of `reference`.
fn align_to(ring: &[LonLat], reference: f64) -> Vec<LonLat> {
    let Some(first) = ring.first() else {
        return Vec::new();
    };
    let turns = ((reference - first.lon_deg) / 360.0).round();
    shifted(ring, turns * 360.0)
}

/// Splits an unwrapped polygon into pieces inside `[-180, 180]`. Holes follow
/// the piece whose shift produced them.
fn split_polygon(outer: Vec<LonLat>, holes: Vec<Vec<LonLat>>) -> Vec<Piece> {
    let Some(first) = outer.first().copied() else {
        return Vec::new();
    };
    let holes: Vec<Vec<LonLat>> = holes.iter().map(|h| align_to(h, first.lon_deg)).collect();

    let (lo, hi) = lon_range(&outer);
    if lo >= WEST_EDGE && hi <= EAST_EDGE {
        return vec![(outer, holes)];
    }

    let mut pieces = Vec::new();
    for turn in [-1.0, 0.0, 1.0] {
        let by = turn * 360.0;
        let ring = clip_ring_to_world(&shifted(&outer, by));
        if ring.len() < 3 || signed_area2(&as_vec2(&ring)).abs() < 1e-12 {
            continue;
        }
        let piece_holes = holes
            .iter()
            .map(|h| clip_ring_to_world(&shifted(h, by)))
            .filter(|h| h.len() >= 3 && signed_area2(&as_vec2(h)).abs() >= 1e-12)
            .collect();
        pieces.push((ring, piece_holes));
    }
    pieces
}

fn as_vec2(ring: &[LonLat]) -> Vec<Vec2> {
    ring.iter().map(|p| Vec2::new(p.lon_deg, p.lat_deg)).collect()
}

fn clip_ring_to_world(ring: &[LonLat]) -> Vec<LonLat> {
    let west = clip_ring(ring, WEST_EDGE, true);
    clip_ring(&west, EAST_EDGE, false)
}

/// Sutherland-Hodgman against one meridian. Keeps `lon >= edge` when
/// `keep_east`, else `lon <= edge`.
fn clip_ring(ring: &[LonLat], edge: f64, keep_east: bool) -> Vec<LonLat> {
    let inside = |p: &LonLat| {
        if keep_east {
            p.lon_deg >= edge
        } else {
            p.lon_deg <= edge
        }
    };

    let mut out = Vec::with_capacity(ring.len() + 2);
    for (i, cur) in ring.iter().enumerate() {
        let prev = ring[(i + ring.len() - 1) % ring.len()];
        match (inside(&prev), inside(cur)) {
            (true, true) => out.push(*cur),
            (true, false) => out.push(crossing(prev, *cur, edge)),
            (false, true) => {
                out.push(crossing(prev, *cur, edge));
                out.push(*cur);
            }
            (false, false) => {}
        }
    }
    out
}

fn crossing(a: LonLat, b: LonLat, lon: f64) -> LonLat {
    let t = (lon - a.lon_deg) / (b.lon_deg - a.lon_deg);
    LonLat::new(lon, a.lat_deg + (b.lat_deg - a.lat_deg) * t)
}

/// Splits an unwrapped polyline into runs inside `[-180, 180]`.
fn split_line(line: &[LonLat]) -> Vec<Vec<LonLat>> {
    let (lo, hi) = lon_range(line);
    if lo >= WEST_EDGE && hi <= EAST_EDGE {
        return vec![line.to_vec()];
    }

    let mut runs = Vec::new();
    for turn in [-1.0, 0.0, 1.0] {
        let moved = shifted(line, turn * 360.0);
        let mut run: Vec<LonLat> = Vec::new();
        for pair in moved.windows(2) {
            let Some((a, b)) = clip_segment(pair[0], pair[1]) else {
                if run.len() >= 2 {
                    runs.push(std::mem::take(&mut run));
                }
                run.clear();
                continue;
            };
            if run.last() != Some(&a) {
                if run.len() >= 2 {
                    runs.push(std::mem::take(&mut run));
                }
                run.clear();
                run.push(a);
            }
            run.push(b);
        }
        if run.len() >= 2 {
            runs.push(run);
        }
    }
    runs
}

fn clip_segment(a: LonLat, b: LonLat) -> Option<(LonLat, LonLat)> {
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let d = b.lon_deg - a.lon_deg;
    if d == 0.0 {
        return (a.lon_deg >= WEST_EDGE && a.lon_deg <= EAST_EDGE).then_some((a, b));
    }
    for edge in [WEST_EDGE, EAST_EDGE] {
        let t = (edge - a.lon_deg) / d;
        let entering = if edge == WEST_EDGE { d > 0.0 } else { d < 0.0 };
        if entering {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
    }
    if t0 > t1 {
        return None;
    }
    let at = |t: f64| {
        if t == 0.0 {
            a
        } else if t == 1.0 {
            b
        } else {
            LonLat::new(
                a.lon_deg + d * t,
                a.lat_deg + (b.lat_deg - a.lat_deg) * t,
            )
        }
    };
    Some((at(t0), at(t1)))
}
