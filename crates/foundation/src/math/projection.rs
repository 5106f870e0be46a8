use super::{LonLat, Vec2};

/// Map projections a footprint map can be displayed in.
///
/// World coordinates are normalized: one world unit is the full width of the
/// tile pyramid at zoom 0, with the origin at the north-west corner and `y`
/// growing downward.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Projection {
    /// Plate carrée (EPSG:4326). The world is one unit wide and half a unit tall.
    #[default]
    Geographic,
    /// North polar stereographic (EPSG:3413), central meridian -45.
    Arctic,
    /// South polar stereographic (EPSG:3031), central meridian 0.
    Antarctic,
}

// Polar disks map the equator to a circle of radius 0.5 around the centre.
const POLAR_SCALE: f64 = 0.5;
const ARCTIC_CENTRAL_LON: f64 = -45.0;
const ANTARCTIC_CENTRAL_LON: f64 = 0.0;

impl Projection {
    /// Lower-case EPSG token, as used by WMTS imagery endpoints.
    pub fn epsg_token(self) -> &'static str {
        match self {
            Projection::Geographic => "epsg4326",
            Projection::Arctic => "epsg3413",
            Projection::Antarctic => "epsg3031",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "geographic" | "epsg4326" | "epsg:4326" => Some(Projection::Geographic),
            "arctic" | "epsg3413" | "epsg:3413" => Some(Projection::Arctic),
            "antarctic" | "epsg3031" | "epsg:3031" => Some(Projection::Antarctic),
            _ => None,
        }
    }

    /// Only the cylindrical projection has a seam at the antimeridian.
    pub fn splits_antimeridian(self) -> bool {
        self == Projection::Geographic
    }

    /// World extent `(width, height)` in normalized units.
    pub fn world_extent(self) -> Vec2 {
        match self {
            Projection::Geographic => Vec2::new(1.0, 0.5),
            Projection::Arctic | Projection::Antarctic => Vec2::new(1.0, 1.0),
        }
    }

    /// Longitudes outside `[-180, 180]` are projected linearly past the world
    /// edge in the geographic projection; polar projections wrap naturally.
    pub fn to_world(self, p: LonLat) -> Vec2 {
        match self {
            Projection::Geographic => {
                Vec2::new((p.lon_deg + 180.0) / 360.0, (90.0 - p.lat_deg) / 360.0)
            }
            Projection::Arctic => {
                let rho = ((90.0 - p.lat_deg) / 2.0).to_radians().tan() * POLAR_SCALE;
                let theta = (p.lon_deg - ARCTIC_CENTRAL_LON).to_radians();
                Vec2::new(0.5 + rho * theta.sin(), 0.5 + rho * theta.cos())
            }
            Projection::Antarctic => {
                let rho = ((90.0 + p.lat_deg) / 2.0).to_radians().tan() * POLAR_SCALE;
                let theta = (p.lon_deg - ANTARCTIC_CENTRAL_LON).to_radians();
                Vec2::new(0.5 + rho * theta.sin(), 0.5 - rho * theta.cos())
            }
        }
    }

    pub fn from_world(self, w: Vec2) -> LonLat {
        match self {
            Projection::Geographic => LonLat::new(w.x * 360.0 - 180.0, 90.0 - w.y * 360.0),
            Projection::Arctic => {
                let dx = w.x - 0.5;
                let dy = w.y - 0.5;
                let rho = (dx * dx + dy * dy).sqrt() / POLAR_SCALE;
                let lat = 90.0 - 2.0 * rho.atan().to_degrees();
                let lon = ARCTIC_CENTRAL_LON + dx.atan2(dy).to_degrees();
                LonLat::new(super::normalize_lon(lon), lat)
            }
            Projection::Antarctic => {
                let dx = w.x - 0.5;
                let dy = w.y - 0.5;
                let rho = (dx * dx + dy * dy).sqrt() / POLAR_SCALE;
                let lat = 2.0 * rho.atan().to_degrees() - 90.0;
                let lon = ANTARCTIC_CENTRAL_LON + dx.atan2(-dy).to_degrees();
                LonLat::new(super::normalize_lon(lon), lat)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Projection;
    use crate::math::{LonLat, Vec2};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn geographic_corners() {
        let p = Projection::Geographic;
        assert_eq!(p.to_world(LonLat::new(-180.0, 90.0)), Vec2::new(0.0, 0.0));
        assert_eq!(p.to_world(LonLat::new(180.0, -90.0)), Vec2::new(1.0, 0.5));
    }

    #[test]
    fn polar_projections_put_pole_at_centre() {
        assert_eq!(
            Projection::Arctic.to_world(LonLat::new(12.0, 90.0)),
            Vec2::new(0.5, 0.5)
        );
        let south = Projection::Antarctic.to_world(LonLat::new(-77.0, -90.0));
        assert_close(south.x, 0.5, 1e-12);
        assert_close(south.y, 0.5, 1e-12);
    }

    #[test]
    fn round_trips_every_projection() {
        for proj in [
            Projection::Geographic,
            Projection::Arctic,
            Projection::Antarctic,
        ] {
            let lat = if proj == Projection::Antarctic { -60.0 } else { 60.0 };
            let geo = LonLat::new(33.0, lat);
            let back = proj.from_world(proj.to_world(geo));
            assert_close(back.lon_deg, geo.lon_deg, 1e-9);
            assert_close(back.lat_deg, geo.lat_deg, 1e-9);
        }
    }

    #[test]
    fn only_geographic_splits() {
        assert!(Projection::Geographic.splits_antimeridian());
        assert!(!Projection::Arctic.splits_antimeridian());
        assert_eq!(Projection::from_name("EPSG:3031"), Some(Projection::Antarctic));
    }
}
