//! Raster Compositor: the three rasters of one tile.
//!
//! Outline: a faint baseline stroke of every fragment, with the coloured
//! strokes composited over it. Coloured strokes use destination-over among
//! themselves, so earlier footprints stay on top of later ones.
//!
//! Index: every fragment painted in its ordinal colour, last to first, so the
//! earliest footprint wins where shapes overlap.
//!
//! Imagery: fragments grouped by imagery URL and painted through their own
//! shapes, strictly in group order, as images arrive.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::canvas::{Canvas, Composite, Mask};
use crate::clipper::Fragment;
use crate::color::encode_ordinal;
use crate::config::RendererConfig;
use crate::path::PathKind;

/// Colours and emphasis for one draw pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineStyle {
    pub color: Rgba<u8>,
    pub light_color: Rgba<u8>,
    pub project_page: bool,
    /// Ordinals drawn at highlight width (focused and sticky).
    pub emphasized: Vec<usize>,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            color: Rgba([46, 204, 113, 255]),
            light_color: Rgba([171, 235, 198, 255]),
            project_page: false,
            emphasized: Vec::new(),
        }
    }
}

fn stroke_mask(fragment: &Fragment, size: u32, width: f64, point_radius: f64) -> Mask {
    let mut mask = Mask::new(size, size);
    match fragment.kind {
        PathKind::Area => {
            for ring in fragment.rings() {
                mask.stroke(ring, true, width);
            }
        }
        PathKind::Line => mask.stroke(&fragment.points, false, width),
        PathKind::Point => {
            if let Some(p) = fragment.points.first() {
                let half = width / 2.0;
                mask.annulus(*p, (point_radius - half).max(0.0), point_radius + half);
            }
        }
    }
    mask
}

fn outline_pen(fragment: &Fragment, style: &OutlineStyle, config: &RendererConfig) -> (Rgba<u8>, f64) {
    if style.emphasized.contains(&fragment.ordinal) {
        return (style.color, config.highlight_width);
    }
    match (fragment.deemphasized, style.project_page) {
        (Some(true), false) => (style.light_color, config.outline_width),
        (Some(false), false) => (style.color, config.emphasized_outline_width),
        _ => (style.color, config.outline_width),
    }
}

pub fn draw_outline(
    fragments: &[Fragment],
    size: u32,
    style: &OutlineStyle,
    config: &RendererConfig,
) -> RgbaImage {
    let mut outline = Canvas::new(size, size);
    let baseline = config.baseline_color();
    for fragment in fragments {
        let mask = stroke_mask(fragment, size, config.outline_width, config.point_radius);
        outline.fill_mask(&mask, baseline);
    }

    let mut colored = Canvas::new(size, size);
    colored.composite = Composite::DestinationOver;
    for fragment in fragments {
        let (color, width) = outline_pen(fragment, style, config);
        let mask = stroke_mask(fragment, size, width, config.point_radius);
        colored.fill_mask(&mask, color);
    }

    outline.draw_image(colored.image(), 0, 0, size, size);
    outline.into_image()
}

pub fn draw_index(fragments: &[Fragment], size: u32, config: &RendererConfig) -> RgbaImage {
    let mut index = Canvas::new(size, size);
    for fragment in fragments.iter().rev() {
        let mut mask = Mask::new(size, size);
        match fragment.kind {
            PathKind::Area => mask.fill_rings(&fragment.rings()),
            PathKind::Line => mask.stroke(&fragment.points, false, config.index_line_width),
            PathKind::Point => {
                if let Some(p) = fragment.points.first() {
                    mask.disc(*p, config.point_radius + config.index_line_width / 2.0);
                }
            }
        }
        index.fill_mask(&mask, encode_ordinal(fragment.ordinal));
    }
    index.into_image()
}

/// Consecutive area fragments sharing one imagery URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageryGroup {
    pub url: String,
    pub ordinals: Vec<usize>,
    pub deemphasized: Mask,
    pub full: Mask,
}

pub fn imagery_groups(fragments: &[Fragment], size: u32) -> Vec<ImageryGroup> {
    let mut groups: Vec<ImageryGroup> = Vec::new();
    for fragment in fragments {
        let Some(url) = fragment.url.as_deref() else {
            continue;
        };
        if fragment.kind != PathKind::Area {
            continue;
        }
        if groups.last().is_none_or(|g| g.url != url) {
            groups.push(ImageryGroup {
                url: url.to_string(),
                ordinals: Vec::new(),
                deemphasized: Mask::new(size, size),
                full: Mask::new(size, size),
            });
        }
        let Some(group) = groups.last_mut() else {
            continue;
        };
        if !group.ordinals.contains(&fragment.ordinal) {
            group.ordinals.push(fragment.ordinal);
        }
        let target = if fragment.deemphasized == Some(true) {
            &mut group.deemphasized
        } else {
            &mut group.full
        };
        target.fill_rings(&fragment.rings());
    }
    groups
}

/// The imagery raster of one tile, filled in as its group images resolve.
///
/// Groups paint strictly in order: a group resolved early is buffered until
/// every earlier group has resolved. A group resolved without an image is
/// skipped.
#[derive(Debug, Clone)]
pub struct ImageryComposite {
    canvas: Canvas,
    groups: Vec<ImageryGroup>,
    slots: Vec<Option<Option<Arc<RgbaImage>>>>,
    next: usize,
    deemphasized_alpha: f32,
}

impl ImageryComposite {
    pub fn new(size: u32, groups: Vec<ImageryGroup>, deemphasized_alpha: f32) -> Self {
        Self {
            canvas: Canvas::new(size, size),
            slots: vec![None; groups.len()],
            groups,
            next: 0,
            deemphasized_alpha,
        }
    }

    pub fn groups(&self) -> &[ImageryGroup] {
        &self.groups
    }

    pub fn raster(&self) -> &RgbaImage {
        self.canvas.image()
    }

    /// Groups painted (or skipped) so far.
    pub fn completed(&self) -> usize {
        self.next
    }

    pub fn is_complete(&self) -> bool {
        self.next == self.groups.len()
    }

    /// Records the outcome for `group` and paints every group that is now
    /// unblocked. Returns how many groups advanced.
    pub fn resolve(&mut self, group: usize, image: Option<Arc<RgbaImage>>) -> usize {
        if group < self.next || group >= self.slots.len() || self.slots[group].is_some() {
            return 0;
        }
        self.slots[group] = Some(image);

        let mut advanced = 0;
        while let Some(slot) = self.slots.get_mut(self.next).and_then(Option::take) {
            if let Some(image) = slot {
                let group = &self.groups[self.next];
                paint_through(&mut self.canvas, &group.deemphasized, &image, self.deemphasized_alpha);
                paint_through(&mut self.canvas, &group.full, &image, 1.0);
            }
            self.next += 1;
            advanced += 1;
        }
        advanced
    }
}

/// Clears the masked pixels, then draws the image through the mask, so
/// translucent layers never stack.
fn paint_through(canvas: &mut Canvas, mask: &Mask, image: &RgbaImage, alpha: f32) {
    if mask.is_empty() {
        return;
    }
    let size = canvas.width();

    canvas.set_clip(None);
    canvas.composite = Composite::DestinationOut;
    canvas.global_alpha = 1.0;
    canvas.fill_mask(mask, Rgba([0, 0, 0, 255]));

    canvas.set_clip(Some(mask.clone()));
    canvas.composite = Composite::SourceOver;
    canvas.global_alpha = alpha;
    canvas.draw_image(image, 0, 0, size, size);

    canvas.set_clip(None);
    canvas.global_alpha = 1.0;
}

/// All three rasters of one tile from a single fragment list.
#[derive(Debug, Clone)]
pub struct TileRaster {
    pub outline: RgbaImage,
    pub index: RgbaImage,
    pub imagery: ImageryComposite,
}

pub fn draw_tile(
    fragments: &[Fragment],
    size: u32,
    style: &OutlineStyle,
    config: &RendererConfig,
) -> TileRaster {
    TileRaster {
        outline: draw_outline(fragments, size, style, config),
        index: draw_index(fragments, size, config),
        imagery: ImageryComposite::new(
            size,
            imagery_groups(fragments, size),
            config.deemphasized_imagery_alpha,
        ),
    }
}
