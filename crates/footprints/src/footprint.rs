use foundation::GeoBounds;
use foundation::math::{LonLat, unwrap_lons};

use crate::coords::{CoordinateError, GeoBox, parse_box, parse_path, parse_point};
use crate::temporal::temporal_label;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FootprintId(pub String);

impl FootprintId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FootprintId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for FootprintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Rectangle,
    Line,
    Polygon,
    OrbitBackTrack,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    Cartesian,
    #[default]
    Geodetic,
}

/// Raw coordinate data in its native string encoding. Parsing happens at
/// projection time; one malformed entry blanks the whole footprint.
#[derive(Debug, Clone, PartialEq)]
pub enum Spatial {
    Points(Vec<String>),
    Rectangles(Vec<String>),
    Lines(Vec<String>),
    /// Each polygon is `[outer, hole, hole, ...]`.
    Polygons(Vec<Vec<String>>),
    /// Orbit back-track swaths, one polygon per orbit pass.
    OrbitBackTrack(Vec<Vec<String>>),
}

impl Spatial {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Spatial::Points(_) => GeometryKind::Point,
            Spatial::Rectangles(_) => GeometryKind::Rectangle,
            Spatial::Lines(_) => GeometryKind::Line,
            Spatial::Polygons(_) => GeometryKind::Polygon,
            Spatial::OrbitBackTrack(_) => GeometryKind::OrbitBackTrack,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Spatial::Points(v) | Spatial::Rectangles(v) | Spatial::Lines(v) => v.is_empty(),
            Spatial::Polygons(v) | Spatial::OrbitBackTrack(v) => v.is_empty(),
        }
    }
}

/// A parsed geographic shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(LonLat),
    Rectangle(GeoBox),
    Line(Vec<LonLat>),
    /// Outer ring first, then holes. Rings are open (no repeated vertex).
    Polygon(Vec<Vec<LonLat>>),
}

impl Shape {
    /// Vertices of the outer boundary with longitudes unwrapped to be
    /// contiguous.
    fn unwrapped_outline(&self) -> Vec<LonLat> {
        match self {
            Shape::Point(p) => vec![*p],
            Shape::Rectangle(b) => b.unwrapped_corners().to_vec(),
            Shape::Line(points) => unwrap_lons(points),
            Shape::Polygon(rings) => rings.first().map(|r| unwrap_lons(r)).unwrap_or_default(),
        }
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.unwrapped_outline().iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub id: FootprintId,
    pub spatial: Spatial,
    pub interpolation: Interpolation,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
}

impl Footprint {
    pub fn new(id: impl Into<String>, spatial: Spatial) -> Self {
        Self {
            id: FootprintId(id.into()),
            spatial,
            interpolation: Interpolation::default(),
            time_start: None,
            time_end: None,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_time(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.time_start = start.map(str::to_string);
        self.time_end = end.map(str::to_string);
        self
    }

    pub fn kind(&self) -> GeometryKind {
        self.spatial.kind()
    }

    /// Parses every shape. Orbit swaths come back as one polygon per pass, in
    /// source order.
    pub fn shapes(&self) -> Result<Vec<Shape>, CoordinateError> {
        match &self.spatial {
            Spatial::Points(raw) => raw
                .iter()
                .map(|s| parse_point(s).map(Shape::Point))
                .collect(),
            Spatial::Rectangles(raw) => raw
                .iter()
                .map(|s| parse_box(s).map(Shape::Rectangle))
                .collect(),
            Spatial::Lines(raw) => raw
                .iter()
                .map(|s| parse_path(s, 2).map(Shape::Line))
                .collect(),
            Spatial::Polygons(raw) | Spatial::OrbitBackTrack(raw) => raw
                .iter()
                .map(|rings| {
                    rings
                        .iter()
                        .map(|ring| parse_path(ring, 3))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Shape::Polygon)
                })
                .collect(),
        }
    }

    /// Union of all shape bounds. `None` when nothing parses.
    pub fn bounds(&self) -> Option<GeoBounds> {
        let shapes = self.shapes().ok()?;
        shapes
            .iter()
            .filter_map(Shape::bounds)
            .reduce(|a, b| {
                GeoBounds::new(
                    a.west.min(b.west),
                    a.south.min(b.south),
                    a.east.max(b.east),
                    a.north.max(b.north),
                )
            })
    }

    /// Anchor for the sticky marker: centre of the first shape.
    pub fn marker_anchor(&self) -> Option<LonLat> {
        let shapes = self.shapes().ok()?;
        let bounds = shapes.first()?.bounds()?;
        let center = bounds.center();
        Some(LonLat::new(
            foundation::math::normalize_lon(center.lon_deg),
            center.lat_deg,
        ))
    }

    pub fn temporal_label(&self) -> Vec<String> {
        temporal_label(self.time_start.as_deref(), self.time_end.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::{Footprint, GeometryKind, Shape, Spatial};
    use foundation::math::LonLat;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn polygon_shapes_keep_holes() {
        let fp = Footprint::new(
            "G1",
            Spatial::Polygons(vec![vec![
                "0 0 0 10 10 10 10 0 0 0".into(),
                "2 2 2 4 4 4 2 2".into(),
            ]]),
        );
        let shapes = fp.shapes().unwrap();
        assert_eq!(shapes.len(), 1);
        match &shapes[0] {
            Shape::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 4);
                assert_eq!(rings[1].len(), 3);
            }
            other => panic!("unexpected shape {other:?}"),
        }
        assert_eq!(fp.kind(), GeometryKind::Polygon);
    }

    #[test]
    fn malformed_entry_fails_the_whole_footprint() {
        let fp = Footprint::new("G1", Spatial::Lines(vec!["0 0 1 1".into(), "0".into()]));
        assert!(fp.shapes().is_err());
        assert!(fp.bounds().is_none());
        assert!(fp.marker_anchor().is_none());
    }

    #[test]
    fn crossing_rectangle_bounds_extend_past_180() {
        let fp = Footprint::new("G1", Spatial::Rectangles(vec!["-10 170 10 -170".into()]));
        let b = fp.bounds().unwrap();
        assert_close(b.west, 170.0);
        assert_close(b.east, 190.0);

        let anchor = fp.marker_anchor().unwrap();
        assert_close(anchor.lon_deg, -180.0);
        assert_close(anchor.lat_deg, 0.0);
    }

    #[test]
    fn marker_anchor_uses_first_shape() {
        let fp = Footprint::new(
            "G1",
            Spatial::Points(vec!["10 20".into(), "-40 -50".into()]),
        );
        assert_eq!(fp.marker_anchor(), Some(LonLat::new(20.0, 10.0)));
    }
}
