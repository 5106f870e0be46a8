use foundation::Aabb2;
use foundation::math::Vec2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PathKind {
    Point,
    Line,
    Area,
}

/// A footprint shape in normalized world coordinates, not yet tied to a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPath {
    pub kind: PathKind,
    pub points: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
    /// Source polygon index; distinguishes orbit passes.
    pub part: usize,
    pub bounds: Aabb2,
}

impl ProjectedPath {
    pub fn new(kind: PathKind, points: Vec<Vec2>, holes: Vec<Vec<Vec2>>, part: usize) -> Self {
        let bounds = Aabb2::from_points(points.iter());
        Self {
            kind,
            points,
            holes,
            part,
            bounds,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.kind == PathKind::Area
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        let shift = |ring: &Vec<Vec2>| ring.iter().map(|p| *p + offset).collect::<Vec<_>>();
        Self::new(
            self.kind,
            shift(&self.points),
            self.holes.iter().map(shift).collect(),
            self.part,
        )
    }
}
