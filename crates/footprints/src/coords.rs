//! Parsing of the native coordinate encodings carried by granule metadata.
//!
//! All encodings are whitespace-separated decimal degrees in `lat lon` order:
//! - point: `"lat lon"`
//! - box: `"south west north east"`
//! - line / ring: `"lat lon lat lon ..."`

use foundation::math::LonLat;

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateError {
    Empty,
    OddValueCount { count: usize },
    NotANumber(String),
    OutOfRange { lon_deg: f64, lat_deg: f64 },
    TooFewPoints { needed: usize, got: usize },
}

impl std::fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateError::Empty => write!(f, "empty coordinate string"),
            CoordinateError::OddValueCount { count } => {
                write!(f, "expected lat/lon pairs, got {count} values")
            }
            CoordinateError::NotANumber(token) => write!(f, "not a number: {token:?}"),
            CoordinateError::OutOfRange { lon_deg, lat_deg } => {
                write!(f, "coordinate out of range: lon={lon_deg} lat={lat_deg}")
            }
            CoordinateError::TooFewPoints { needed, got } => {
                write!(f, "need at least {needed} points, got {got}")
            }
        }
    }
}

impl std::error::Error for CoordinateError {}

/// Box edges in degrees. `west > east` means the box crosses the antimeridian.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBox {
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Corners `[nw, ne, se, sw]` with the east edge shifted past 180 when
    /// the box crosses the antimeridian, so the ring stays contiguous.
    pub fn unwrapped_corners(&self) -> [LonLat; 4] {
        let east = if self.crosses_antimeridian() {
            self.east + 360.0
        } else {
            self.east
        };
        [
            LonLat::new(self.west, self.north),
            LonLat::new(east, self.north),
            LonLat::new(east, self.south),
            LonLat::new(self.west, self.south),
        ]
    }
}

fn parse_values(raw: &str) -> Result<Vec<f64>, CoordinateError> {
    let values = raw
        .split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CoordinateError::NotANumber(t.to_string()))
        })
        .collect::<Result<Vec<f64>, _>>()?;
    if values.is_empty() {
        return Err(CoordinateError::Empty);
    }
    Ok(values)
}

fn checked(lat_deg: f64, lon_deg: f64) -> Result<LonLat, CoordinateError> {
    let p = LonLat::new(lon_deg, lat_deg);
    if !p.is_valid() || lon_deg.abs() > 360.0 {
        return Err(CoordinateError::OutOfRange { lon_deg, lat_deg });
    }
    Ok(p)
}

pub fn parse_point(raw: &str) -> Result<LonLat, CoordinateError> {
    let values = parse_values(raw)?;
    if values.len() != 2 {
        return Err(CoordinateError::OddValueCount {
            count: values.len(),
        });
    }
    checked(values[0], values[1])
}

pub fn parse_box(raw: &str) -> Result<GeoBox, CoordinateError> {
    let values = parse_values(raw)?;
    if values.len() != 4 {
        return Err(CoordinateError::OddValueCount {
            count: values.len(),
        });
    }
    checked(values[0], values[1])?;
    checked(values[2], values[3])?;
    Ok(GeoBox {
        south: values[0],
        west: values[1],
        north: values[2],
        east: values[3],
    })
}

/// Parses a `lat lon` sequence. A repeated closing vertex is dropped.
pub fn parse_path(raw: &str, min_points: usize) -> Result<Vec<LonLat>, CoordinateError> {
    let values = parse_values(raw)?;
    if values.len() % 2 != 0 {
        return Err(CoordinateError::OddValueCount {
            count: values.len(),
        });
    }

    let mut points = values
        .chunks_exact(2)
        .map(|pair| checked(pair[0], pair[1]))
        .collect::<Result<Vec<LonLat>, _>>()?;
    drop_closing_duplicate(&mut points);

    if points.len() < min_points {
        return Err(CoordinateError::TooFewPoints {
            needed: min_points,
            got: points.len(),
        });
    }
    Ok(points)
}

fn drop_closing_duplicate(points: &mut Vec<LonLat>) {
    if points.len() >= 2
        && let (Some(first), Some(last)) = (points.first(), points.last())
        && (first.lon_deg - last.lon_deg).abs() < 1e-9
        && (first.lat_deg - last.lat_deg).abs() < 1e-9
    {
        points.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::{CoordinateError, GeoBox, parse_box, parse_path, parse_point};
    use foundation::math::LonLat;

    #[test]
    fn point_is_lat_lon_order() {
        assert_eq!(parse_point("10 -20").unwrap(), LonLat::new(-20.0, 10.0));
    }

    #[test]
    fn box_is_south_west_north_east() {
        let b = parse_box("-10 170 10 -170").unwrap();
        assert_eq!(
            b,
            GeoBox {
                south: -10.0,
                west: 170.0,
                north: 10.0,
                east: -170.0
            }
        );
        assert!(b.crosses_antimeridian());
        assert_eq!(b.unwrapped_corners()[1], LonLat::new(190.0, 10.0));
    }

    #[test]
    fn closed_ring_drops_duplicate_vertex() {
        let ring = parse_path("0 0 0 10 10 10 0 0", 3).unwrap();
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert_eq!(parse_point(""), Err(CoordinateError::Empty));
        assert_eq!(
            parse_path("1 2 3", 2),
            Err(CoordinateError::OddValueCount { count: 3 })
        );
        assert!(matches!(
            parse_path("1 2 x 4", 2),
            Err(CoordinateError::NotANumber(_))
        ));
        assert!(matches!(
            parse_point("95 0"),
            Err(CoordinateError::OutOfRange { .. })
        ));
        assert_eq!(
            parse_path("0 0 1 1", 3),
            Err(CoordinateError::TooFewPoints { needed: 3, got: 2 })
        );
    }
}
