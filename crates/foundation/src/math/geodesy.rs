/// Mean Earth radius (meters), used for spherical great-circle math.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LonLat {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl LonLat {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn is_valid(self) -> bool {
        self.lon_deg.is_finite() && self.lat_deg.is_finite() && self.lat_deg.abs() <= 90.0
    }

    /// Unit vector on the sphere.
    pub fn to_unit(self) -> [f64; 3] {
        let lat = self.lat_deg.to_radians();
        let lon = self.lon_deg.to_radians();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }

    pub fn from_unit(v: [f64; 3]) -> Self {
        let lat = v[2].clamp(-1.0, 1.0).asin();
        let lon = v[1].atan2(v[0]);
        Self::new(lon.to_degrees(), lat.to_degrees())
    }
}

/// Wraps a longitude into `[-180, 180)`.
pub fn normalize_lon(lon_deg: f64) -> f64 {
    let wrapped = (lon_deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -0.0 { 0.0 } else { wrapped }
}

/// Central angle between two positions (radians).
pub fn angular_distance(a: LonLat, b: LonLat) -> f64 {
    let ua = a.to_unit();
    let ub = b.to_unit();
    let dot = (ua[0] * ub[0] + ua[1] * ub[1] + ua[2] * ub[2]).clamp(-1.0, 1.0);
    let cross = [
        ua[1] * ub[2] - ua[2] * ub[1],
        ua[2] * ub[0] - ua[0] * ub[2],
        ua[0] * ub[1] - ua[1] * ub[0],
    ];
    let sin = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
    sin.atan2(dot)
}

/// Points strictly between `a` and `b` along the great circle, spaced no more
/// than `max_step_rad` apart.
///
/// Near-antipodal pairs have no unique great circle; they fall back to linear
/// interpolation in lon/lat so the output stays deterministic.
pub fn great_circle_between(a: LonLat, b: LonLat, max_step_rad: f64) -> Vec<LonLat> {
    let omega = angular_distance(a, b);
    if !(max_step_rad > 0.0) || omega <= max_step_rad || !omega.is_finite() {
        return Vec::new();
    }
    let steps = (omega / max_step_rad - 1e-9).ceil() as usize;
    let mut out = Vec::with_capacity(steps.saturating_sub(1));

    let sin_omega = omega.sin();
    if sin_omega.abs() < 1e-9 {
        for i in 1..steps {
            let t = i as f64 / steps as f64;
            out.push(LonLat::new(
                a.lon_deg + (b.lon_deg - a.lon_deg) * t,
                a.lat_deg + (b.lat_deg - a.lat_deg) * t,
            ));
        }
        return out;
    }

    let ua = a.to_unit();
    let ub = b.to_unit();
    for i in 1..steps {
        let t = i as f64 / steps as f64;
        let wa = ((1.0 - t) * omega).sin() / sin_omega;
        let wb = (t * omega).sin() / sin_omega;
        out.push(LonLat::from_unit([
            wa * ua[0] + wb * ub[0],
            wa * ua[1] + wb * ub[1],
            wa * ua[2] + wb * ub[2],
        ]));
    }
    out
}

/// Inserts great-circle intermediate points between consecutive vertices.
///
/// When `closed` is set, the segment from the last vertex back to the first is
/// densified too (the closing vertex itself is not repeated).
pub fn densify_great_circle(points: &[LonLat], max_step_rad: f64, closed: bool) -> Vec<LonLat> {
    let mut out = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        out.push(*p);
        let next = if i + 1 < points.len() {
            points[i + 1]
        } else if closed && points.len() > 1 {
            points[0]
        } else {
            continue;
        };
        out.extend(great_circle_between(*p, next, max_step_rad));
    }
    out
}

/// Makes longitudes continuous along a path: each vertex is shifted by whole
/// turns so it lies within 180 degrees of its predecessor. The first vertex is
/// kept as-is, so the result may leave `[-180, 180]`.
pub fn unwrap_lons(points: &[LonLat]) -> Vec<LonLat> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(points.len());
    let mut prev_lon = first.lon_deg;
    out.push(*first);

    for p in points.iter().skip(1) {
        let mut lon = p.lon_deg;
        while lon - prev_lon > 180.0 {
            lon -= 360.0;
        }
        while lon - prev_lon < -180.0 {
            lon += 360.0;
        }
        prev_lon = lon;
        out.push(LonLat::new(lon, p.lat_deg));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{
        LonLat, angular_distance, densify_great_circle, great_circle_between, normalize_lon,
        unwrap_lons,
    };

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn normalize_lon_wraps_into_half_open_range() {
        assert_close(normalize_lon(190.0), -170.0, 1e-12);
        assert_close(normalize_lon(-190.0), 170.0, 1e-12);
        assert_close(normalize_lon(180.0), -180.0, 1e-12);
        assert_close(normalize_lon(45.0), 45.0, 1e-12);
    }

    #[test]
    fn quarter_turn_along_equator() {
        let d = angular_distance(LonLat::new(0.0, 0.0), LonLat::new(90.0, 0.0));
        assert_close(d, std::f64::consts::FRAC_PI_2, 1e-12);
    }

    #[test]
    fn equator_interpolation_stays_on_equator() {
        let pts = great_circle_between(
            LonLat::new(0.0, 0.0),
            LonLat::new(10.0, 0.0),
            1.0_f64.to_radians(),
        );
        assert_eq!(pts.len(), 9);
        for (i, p) in pts.iter().enumerate() {
            assert_close(p.lat_deg, 0.0, 1e-9);
            assert_close(p.lon_deg, (i + 1) as f64, 1e-9);
        }
    }

    #[test]
    fn great_circle_bows_poleward_between_equal_latitudes() {
        let pts = great_circle_between(
            LonLat::new(-60.0, 45.0),
            LonLat::new(60.0, 45.0),
            5.0_f64.to_radians(),
        );
        let mid = pts[pts.len() / 2];
        assert!(mid.lat_deg > 45.0, "midpoint should bow north: {mid:?}");
    }

    #[test]
    fn densify_closed_ring_includes_closing_segment() {
        let ring = [
            LonLat::new(0.0, 0.0),
            LonLat::new(4.0, 0.0),
            LonLat::new(4.0, 4.0),
        ];
        let open = densify_great_circle(&ring, 1.0_f64.to_radians(), false);
        let closed = densify_great_circle(&ring, 1.0_f64.to_radians(), true);
        assert!(closed.len() > open.len());
        assert_eq!(closed[0], ring[0]);
    }

    #[test]
    fn unwrap_makes_antimeridian_crossing_continuous() {
        let pts = [
            LonLat::new(170.0, 0.0),
            LonLat::new(-170.0, 0.0),
            LonLat::new(-175.0, 5.0),
        ];
        let out = unwrap_lons(&pts);
        assert_close(out[1].lon_deg, 190.0, 1e-12);
        assert_close(out[2].lon_deg, 185.0, 1e-12);
    }
}
