#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit-length perpendicular (rotated +90 degrees), or zero for a zero vector.
    pub fn perp_unit(self) -> Self {
        let len = self.length();
        if len <= 0.0 {
            return Self::ZERO;
        }
        Self::new(-self.y / len, self.x / len)
    }

    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn floor(self) -> Self {
        Self::new(self.x.floor(), self.y.floor())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Twice the signed area of a ring (shoelace). Positive is clockwise in
/// screen space (y down).
pub fn signed_area2(ring: &[Vec2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        sum += a.cross(b);
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::{Vec2, signed_area2};

    #[test]
    fn vec2_add_sub_scale() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(-0.5, 4.0);
        assert_eq!(a + b, Vec2::new(0.5, 6.0));
        assert_eq!(a - b, Vec2::new(1.5, -2.0));
        assert_eq!(a.scale(2.0), Vec2::new(2.0, 4.0));
    }

    #[test]
    fn perp_unit_is_normalized() {
        let p = Vec2::new(3.0, 0.0).perp_unit();
        assert_eq!(p, Vec2::new(-0.0, 1.0));
        assert_eq!(Vec2::ZERO.perp_unit(), Vec2::ZERO);
    }

    #[test]
    fn clockwise_screen_ring_has_positive_area() {
        // Screen space: y grows downward, so this walks clockwise on screen.
        let ring = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert_eq!(signed_area2(&ring), 200.0);
        let reversed: Vec<Vec2> = ring.iter().rev().copied().collect();
        assert_eq!(signed_area2(&reversed), -200.0);
    }
}
