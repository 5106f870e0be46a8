//! Imagery option-set matching and tile URL templating.
//!
//! Option sets come from collection metadata, under
//! `tags["edsc.extra.serverless.gibs"].data`. The first option set that both
//! matches the footprint's dates and enables the active projection decides the
//! URL; no match means the footprint gets no imagery.

use std::collections::BTreeMap;

use footprints::{Footprint, date_part, strip_millis};
use foundation::math::Projection;
use serde::Deserialize;

use crate::view::TileCoord;

pub const IMAGERY_TAG: &str = "edsc.extra.serverless.gibs";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageryTemplates {
    /// Daily composite product URL.
    pub best: String,
    /// Per-granule URL, used when an option set has `granule: true`.
    pub granule: String,
}

impl Default for ImageryTemplates {
    fn default() -> Self {
        Self {
            best: "https://gibs.earthdata.nasa.gov/wmts/{lprojection}/best/{product}/default/{time}/{resolution}/{z}/{y}/{x}.{format}".to_string(),
            granule: "http://uat.gibs.earthdata.nasa.gov/wmts/{projection}/std/{product}/default/{time}/{resolution}/{z}/{y}/{x}.{format}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageryOptionSet {
    pub product: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub geographic: bool,
    #[serde(default)]
    pub geographic_resolution: Option<String>,
    #[serde(default)]
    pub arctic: bool,
    #[serde(default)]
    pub arctic_resolution: Option<String>,
    #[serde(default)]
    pub antarctic: bool,
    #[serde(default)]
    pub antarctic_resolution: Option<String>,
    #[serde(default)]
    pub granule: bool,
    /// Footprint field name to `">=date"`, `"<=date"` or an exact date.
    #[serde(default, rename = "match")]
    pub matcher: BTreeMap<String, String>,
}

fn default_format() -> String {
    "jpeg".to_string()
}

impl ImageryOptionSet {
    pub fn supports(&self, projection: Projection) -> bool {
        match projection {
            Projection::Geographic => self.geographic,
            Projection::Arctic => self.arctic,
            Projection::Antarctic => self.antarctic,
        }
    }

    /// Projection-specific resolution, falling back to `resolution`.
    pub fn resolution_for(&self, projection: Projection) -> Option<&str> {
        let specific = match projection {
            Projection::Geographic => self.geographic_resolution.as_deref(),
            Projection::Arctic => self.arctic_resolution.as_deref(),
            Projection::Antarctic => self.antarctic_resolution.as_deref(),
        };
        specific.or(self.resolution.as_deref())
    }

    /// Every matcher entry must hold. Values compare as `YYYY-MM-DD` strings.
    pub fn matches(&self, footprint: &Footprint) -> bool {
        self.matcher.iter().all(|(field, expected)| {
            let raw = match field.as_str() {
                "time_start" => footprint.time_start.as_deref(),
                "time_end" => footprint.time_end.as_deref(),
                _ => None,
            };
            let Some(actual) = raw.and_then(date_part) else {
                return false;
            };
            if let Some(bound) = expected.strip_prefix(">=") {
                actual >= bound.trim()
            } else if let Some(bound) = expected.strip_prefix("<=") {
                actual <= bound.trim()
            } else {
                actual == expected.trim()
            }
        })
    }
}

#[derive(Debug)]
pub enum ImageryConfigError {
    Json(serde_json::Error),
    NotAList,
}

impl std::fmt::Display for ImageryConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageryConfigError::Json(e) => write!(f, "invalid imagery option set: {e}"),
            ImageryConfigError::NotAList => write!(f, "imagery tag data is not a list"),
        }
    }
}

impl std::error::Error for ImageryConfigError {}

/// Reads option sets from a collection's `tags` object. A missing tag is not
/// an error: the collection simply has no imagery.
pub fn option_sets_from_tags(
    tags: &serde_json::Value,
) -> Result<Vec<ImageryOptionSet>, ImageryConfigError> {
    let Some(data) = tags.get(IMAGERY_TAG).and_then(|t| t.get("data")) else {
        return Ok(Vec::new());
    };
    if !data.is_array() {
        return Err(ImageryConfigError::NotAList);
    }
    serde_json::from_value(data.clone()).map_err(ImageryConfigError::Json)
}

/// Resolves a footprint's imagery URL for one tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageryResolver {
    templates: ImageryTemplates,
    option_sets: Vec<ImageryOptionSet>,
}

impl ImageryResolver {
    pub fn new(templates: ImageryTemplates, option_sets: Vec<ImageryOptionSet>) -> Self {
        Self {
            templates,
            option_sets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.option_sets.is_empty()
    }

    pub fn select(&self, footprint: &Footprint, projection: Projection) -> Option<&ImageryOptionSet> {
        self.option_sets
            .iter()
            .find(|o| o.supports(projection) && o.matches(footprint))
    }

    /// `rows` is the tile row count at `tile.z`, used for `{-y}`.
    pub fn tile_url(
        &self,
        footprint: &Footprint,
        projection: Projection,
        tile: TileCoord,
        rows: i64,
    ) -> Option<String> {
        let options = self.select(footprint, projection)?;
        let start = footprint.time_start.as_deref()?;

        let (template, time) = if options.granule {
            (&self.templates.granule, strip_millis(start))
        } else {
            (&self.templates.best, date_part(start)?.to_string())
        };

        let epsg = projection.epsg_token();
        Some(fill_template(template, |token| match token {
            "lprojection" | "projection" => Some(epsg.to_string()),
            "product" => Some(options.product.clone()),
            "time" => Some(time.clone()),
            "resolution" => Some(options.resolution_for(projection).unwrap_or_default().to_string()),
            "format" => Some(options.format.clone()),
            "x" => Some(tile.x.to_string()),
            "y" => Some(tile.y.to_string()),
            "z" => Some(tile.z.to_string()),
            "-y" => Some((rows - 1 - tile.y).to_string()),
            _ => None,
        }))
    }
}

/// Replaces `{token}` occurrences. Unknown tokens are left untouched.
pub fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let token = &after[..close];
                match lookup(token) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(token);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::{ImageryResolver, ImageryTemplates, fill_template, option_sets_from_tags};
    use crate::view::TileCoord;
    use footprints::{Footprint, Spatial};
    use foundation::math::Projection;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn granule(start: &str) -> Footprint {
        Footprint::new("G", Spatial::Points(vec!["0 0".into()])).with_time(Some(start), None)
    }

    fn resolver(data: serde_json::Value) -> ImageryResolver {
        let tags = json!({ "edsc.extra.serverless.gibs": { "data": data } });
        ImageryResolver::new(
            ImageryTemplates::default(),
            option_sets_from_tags(&tags).unwrap(),
        )
    }

    #[test]
    fn best_url_uses_date_and_projection_resolution() {
        let r = resolver(json!([{
            "product": "MODIS_Terra_CorrectedReflectance_TrueColor",
            "format": "jpeg",
            "resolution": "250m",
            "geographic": true,
            "geographic_resolution": "500m"
        }]));
        let url = r
            .tile_url(&granule("2020-03-04T05:06:07.890Z"), Projection::Geographic, TileCoord::new(3, 1, 2), 2)
            .unwrap();
        assert_eq!(
            url,
            "https://gibs.earthdata.nasa.gov/wmts/epsg4326/best/MODIS_Terra_CorrectedReflectance_TrueColor/default/2020-03-04/500m/2/1/3.jpeg"
        );
    }

    #[test]
    fn granule_url_strips_millis() {
        let r = resolver(json!([{ "product": "P", "geographic": true, "granule": true, "resolution": "1km" }]));
        let url = r
            .tile_url(&granule("2020-03-04T05:06:07.890Z"), Projection::Geographic, TileCoord::new(0, 0, 0), 1)
            .unwrap();
        assert!(url.contains("/std/P/default/2020-03-04T05:06:07Z/1km/0/0/0.jpeg"), "{url}");
    }

    #[test]
    fn first_matching_option_set_wins() {
        let r = resolver(json!([
            { "product": "OLD", "geographic": true, "match": { "time_start": "<=2010-01-01" } },
            { "product": "NEW", "geographic": true, "match": { "time_start": ">=2010-01-01" } },
            { "product": "ANY", "geographic": true }
        ]));
        let pick = |start| r.select(&granule(start), Projection::Geographic).map(|o| o.product.clone());
        assert_eq!(pick("2005-06-01T00:00:00Z").as_deref(), Some("OLD"));
        assert_eq!(pick("2010-01-01T12:00:00Z").as_deref(), Some("OLD"));
        assert_eq!(pick("2015-06-01T00:00:00Z").as_deref(), Some("NEW"));
    }

    #[test]
    fn unsupported_projection_or_missing_field_means_no_imagery() {
        let r = resolver(json!([{ "product": "P", "geographic": true, "match": { "time_end": "2020-01-01" } }]));
        let fp = granule("2020-01-01T00:00:00Z");
        assert!(r.select(&fp, Projection::Geographic).is_none());
        assert!(r.tile_url(&fp, Projection::Arctic, TileCoord::new(0, 0, 0), 1).is_none());

        let fp = fp.with_time(Some("2020-01-01T00:00:00Z"), Some("2020-01-01T23:00:00Z"));
        assert!(r.select(&fp, Projection::Geographic).is_some());
    }

    #[test]
    fn missing_tag_is_empty_and_bad_shape_errors() {
        assert!(option_sets_from_tags(&json!({})).unwrap().is_empty());
        assert!(option_sets_from_tags(&json!({ "edsc.extra.serverless.gibs": { "data": 3 } })).is_err());
        assert!(option_sets_from_tags(&json!({ "edsc.extra.serverless.gibs": { "data": [{}] } })).is_err());
    }

    #[test]
    fn template_tokens() {
        let out = fill_template("a/{x}/{-y}/{unknown}/{", |t| match t {
            "x" => Some("1".into()),
            "-y" => Some("2".into()),
            _ => None,
        });
        assert_eq!(out, "a/1/2/{unknown}/{");
    }
}
