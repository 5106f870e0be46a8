//! Software rasterizer for tile rasters.
//!
//! Geometry is first rasterized into a coverage [`Mask`] (pixel-centre
//! sampling, no anti-aliasing), then a [`Canvas`] blends a colour or an image
//! through the mask. Keeping coverage binary makes the index raster exact.

use foundation::math::Vec2;
use image::{Rgba, RgbaImage};

/// Pixel coverage as sorted, non-overlapping half-open spans per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    rows: Vec<Vec<(u32, u32)>>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rows: vec![Vec::new(); height as usize],
        }
    }

    pub fn full(width: u32, height: u32) -> Self {
        let mut m = Self::new(width, height);
        for y in 0..height as i64 {
            m.add_span(y, 0, width as i64);
        }
        m
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Number of covered pixels.
    pub fn area(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.iter())
            .map(|(a, b)| (b - a) as usize)
            .sum()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        let Some(row) = self.rows.get(y as usize) else {
            return false;
        };
        let i = row.partition_point(|(_, end)| *end <= x);
        row.get(i).is_some_and(|(start, _)| *start <= x)
    }

    /// `(y, x_start, x_end)` for every span, rows top to bottom.
    pub fn spans(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(y, row)| row.iter().map(move |(a, b)| (y as u32, *a, *b)))
    }

    /// Adds `[x0, x1)` on row `y`, clamped to the mask.
    pub fn add_span(&mut self, y: i64, x0: i64, x1: i64) {
        if y < 0 || y >= self.height as i64 {
            return;
        }
        let x0 = x0.clamp(0, self.width as i64) as u32;
        let x1 = x1.clamp(0, self.width as i64) as u32;
        if x0 >= x1 {
            return;
        }

        let row = &mut self.rows[y as usize];
        let start = row.partition_point(|(_, end)| *end < x0);
        let mut merged = (x0, x1);
        let mut stop = start;
        while stop < row.len() && row[stop].0 <= merged.1 {
            merged.0 = merged.0.min(row[stop].0);
            merged.1 = merged.1.max(row[stop].1);
            stop += 1;
        }
        row.splice(start..stop, std::iter::once(merged));
    }

    pub fn union(&mut self, other: &Mask) {
        for (y, a, b) in other.spans() {
            self.add_span(y as i64, a as i64, b as i64);
        }
    }

    /// Nonzero-winding fill of one or more rings. Rings are implicitly
    /// closed; holes need the opposite winding of their outer ring.
    pub fn fill_rings<R: AsRef<[Vec2]>>(&mut self, rings: &[R]) {
        // (top, bottom, direction)
        let mut edges: Vec<(Vec2, Vec2, i32)> = Vec::new();
        for ring in rings {
            let ring = ring.as_ref();
            if ring.len() < 2 || !ring.iter().all(|p| p.is_finite()) {
                continue;
            }
            for (i, a) in ring.iter().enumerate() {
                let b = ring[(i + 1) % ring.len()];
                if a.y == b.y {
                    continue;
                }
                if a.y < b.y {
                    edges.push((*a, b, 1));
                } else {
                    edges.push((b, *a, -1));
                }
            }
        }
        if edges.is_empty() {
            return;
        }

        let y_min = edges.iter().map(|e| e.0.y).fold(f64::INFINITY, f64::min);
        let y_max = edges
            .iter()
            .map(|e| e.1.y)
            .fold(f64::NEG_INFINITY, f64::max);
        let row_start = ((y_min - 0.5).ceil() as i64).max(0);
        let row_end = ((y_max - 0.5).ceil() as i64).min(self.height as i64);

        let mut crossings: Vec<(f64, i32)> = Vec::new();
        for row in row_start..row_end {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for (top, bottom, dir) in &edges {
                if yc >= top.y && yc < bottom.y {
                    let t = (yc - top.y) / (bottom.y - top.y);
                    crossings.push((top.x + (bottom.x - top.x) * t, *dir));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for i in 0..crossings.len() {
                winding += crossings[i].1;
                if winding != 0
                    && let Some(next) = crossings.get(i + 1)
                {
                    let x0 = (crossings[i].0 - 0.5).ceil() as i64;
                    let x1 = (next.0 - 0.5).ceil() as i64;
                    self.add_span(row, x0, x1);
                }
            }
        }
    }

    /// Covers pixel centres within `radius` of `center`.
    pub fn disc(&mut self, center: Vec2, radius: f64) {
        self.annulus(center, 0.0, radius);
    }

    /// Covers pixel centres whose distance `d` from `center` satisfies
    /// `inner <= d <= outer`.
    pub fn annulus(&mut self, center: Vec2, inner: f64, outer: f64) {
        if !center.is_finite() || !(outer > 0.0) {
            return;
        }
        let row_start = ((center.y - outer - 0.5).ceil() as i64).max(0);
        let row_end = ((center.y + outer - 0.5).floor() as i64 + 1).min(self.height as i64);
        for row in row_start..row_end {
            let dy = row as f64 + 0.5 - center.y;
            let outer_dx2 = outer * outer - dy * dy;
            if outer_dx2 < 0.0 {
                continue;
            }
            let outer_dx = outer_dx2.sqrt();
            let x0 = (center.x - outer_dx - 0.5).ceil() as i64;
            let x1 = (center.x + outer_dx - 0.5).floor() as i64 + 1;

            let inner_dx2 = inner * inner - dy * dy;
            if inner <= 0.0 || inner_dx2 <= 0.0 {
                self.add_span(row, x0, x1);
                continue;
            }
            // Exclude centres strictly inside the inner circle.
            let inner_dx = inner_dx2.sqrt();
            let hole0 = (center.x - inner_dx - 0.5).floor() as i64 + 1;
            let hole1 = (center.x + inner_dx - 0.5).ceil() as i64;
            self.add_span(row, x0, hole0.max(x0));
            self.add_span(row, hole1.min(x1), x1);
        }
    }

    /// Stroke with round joins and caps: segment quads plus vertex discs.
    pub fn stroke(&mut self, points: &[Vec2], closed: bool, width: f64) {
        if points.is_empty() || !(width > 0.0) {
            return;
        }
        let half = width / 2.0;
        let segment_count = if closed && points.len() > 2 {
            points.len()
        } else {
            points.len() - 1
        };

        for i in 0..segment_count {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            let n = (b - a).perp_unit().scale(half);
            if n == Vec2::ZERO {
                continue;
            }
            self.fill_rings(&[[a + n, b + n, b - n, a - n]]);
        }
        for p in points {
            self.disc(*p, half);
        }
    }
}

/// Porter-Duff operators used by the compositor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Composite {
    #[default]
    SourceOver,
    DestinationOver,
    DestinationOut,
}

/// An RGBA raster with straight (non-premultiplied) alpha.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
    clip: Option<Mask>,
    pub global_alpha: f32,
    pub composite: Composite,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            clip: None,
            global_alpha: 1.0,
            composite: Composite::SourceOver,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    pub fn set_clip(&mut self, clip: Option<Mask>) {
        self.clip = clip;
    }

    fn clipped(&self, x: u32, y: u32) -> bool {
        self.clip.as_ref().is_some_and(|c| !c.contains(x, y))
    }

    /// Paints `color` on every pixel covered by `mask`.
    pub fn fill_mask(&mut self, mask: &Mask, color: Rgba<u8>) {
        for (y, x0, x1) in mask.spans() {
            if y >= self.height() {
                break;
            }
            for x in x0..x1.min(self.width()) {
                if self.clipped(x, y) {
                    continue;
                }
                let dst = *self.image.get_pixel(x, y);
                let out = blend(dst, color, self.global_alpha, self.composite);
                self.image.put_pixel(x, y, out);
            }
        }
    }

    /// Draws `src` scaled (nearest neighbour) into the rectangle at
    /// `(dst_x, dst_y)` of size `dst_w` by `dst_h`.
    pub fn draw_image(&mut self, src: &RgbaImage, dst_x: i64, dst_y: i64, dst_w: u32, dst_h: u32) {
        if src.width() == 0 || src.height() == 0 || dst_w == 0 || dst_h == 0 {
            return;
        }
        let x_start = dst_x.max(0);
        let y_start = dst_y.max(0);
        let x_end = (dst_x + dst_w as i64).min(self.width() as i64);
        let y_end = (dst_y + dst_h as i64).min(self.height() as i64);

        for y in y_start..y_end {
            let sy = (((y - dst_y) as u64 * src.height() as u64) / dst_h as u64) as u32;
            for x in x_start..x_end {
                let (ux, uy) = (x as u32, y as u32);
                if self.clipped(ux, uy) {
                    continue;
                }
                let sx = (((x - dst_x) as u64 * src.width() as u64) / dst_w as u64) as u32;
                let color = *src.get_pixel(sx, sy);
                let dst = *self.image.get_pixel(ux, uy);
                let out = blend(dst, color, self.global_alpha, self.composite);
                self.image.put_pixel(ux, uy, out);
            }
        }
    }
}

fn blend(dst: Rgba<u8>, src: Rgba<u8>, global_alpha: f32, op: Composite) -> Rgba<u8> {
    let sa = src.0[3] as f32 / 255.0 * global_alpha.clamp(0.0, 1.0);
    let da = dst.0[3] as f32 / 255.0;

    let (out_a, out_rgb) = match op {
        Composite::SourceOver => {
            let a = sa + da * (1.0 - sa);
            let rgb = mix(src, sa, dst, da * (1.0 - sa), a);
            (a, rgb)
        }
        Composite::DestinationOver => {
            let a = da + sa * (1.0 - da);
            let rgb = mix(dst, da, src, sa * (1.0 - da), a);
            (a, rgb)
        }
        Composite::DestinationOut => {
            let a = da * (1.0 - sa);
            (a, [dst.0[0], dst.0[1], dst.0[2]])
        }
    };

    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    Rgba([
        out_rgb[0],
        out_rgb[1],
        out_rgb[2],
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

fn mix(top: Rgba<u8>, top_w: f32, bottom: Rgba<u8>, bottom_w: f32, total: f32) -> [u8; 3] {
    if total <= 0.0 {
        return [0, 0, 0];
    }
    let mut out = [0u8; 3];
    for (i, c) in out.iter_mut().enumerate() {
        let v = (top.0[i] as f32 * top_w + bottom.0[i] as f32 * bottom_w) / total;
        *c = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Canvas, Composite, Mask};
    use foundation::math::Vec2;
    use image::{Rgba, RgbaImage};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x1, y0),
            Vec2::new(x1, y1),
            Vec2::new(x0, y1),
        ]
    }

    #[test]
    fn spans_merge_and_stay_sorted() {
        let mut m = Mask::new(10, 1);
        m.add_span(0, 5, 7);
        m.add_span(0, 1, 3);
        m.add_span(0, 2, 6);
        assert_eq!(m.spans().collect::<Vec<_>>(), vec![(0, 1, 7)]);
        m.add_span(0, 8, 20);
        assert_eq!(m.area(), 8);
        assert!(m.contains(6, 0));
        assert!(!m.contains(7, 0));
        assert!(m.contains(9, 0));
    }

    #[test]
    fn fill_samples_pixel_centres() {
        let mut m = Mask::new(10, 10);
        m.fill_rings(&[square(2.0, 2.0, 5.0, 4.0)]);
        assert_eq!(m.area(), 3 * 2);
        assert!(m.contains(2, 2));
        assert!(m.contains(4, 3));
        assert!(!m.contains(5, 3));
        assert!(!m.contains(2, 4));
    }

    #[test]
    fn opposite_winding_hole_is_subtracted() {
        let mut m = Mask::new(10, 10);
        let outer = square(0.0, 0.0, 10.0, 10.0);
        let mut hole = square(3.0, 3.0, 6.0, 6.0);
        hole.reverse();
        m.fill_rings(&[outer, hole]);
        assert_eq!(m.area(), 100 - 9);
        assert!(!m.contains(4, 4));
        assert!(m.contains(2, 4));
    }

    #[test]
    fn same_winding_overlap_stays_filled() {
        let mut m = Mask::new(10, 10);
        m.fill_rings(&[square(0.0, 0.0, 10.0, 10.0), square(3.0, 3.0, 6.0, 6.0)]);
        assert_eq!(m.area(), 100);
    }

    #[test]
    fn stroke_covers_a_one_pixel_line() {
        let mut m = Mask::new(10, 10);
        m.stroke(&[Vec2::new(1.0, 5.5), Vec2::new(8.0, 5.5)], false, 1.0);
        assert!(m.contains(1, 5));
        assert!(m.contains(7, 5));
        assert!(!m.contains(4, 4));
        assert!(!m.contains(4, 6));
    }

    #[test]
    fn annulus_leaves_centre_empty() {
        let mut m = Mask::new(20, 20);
        m.annulus(Vec2::new(10.0, 10.0), 3.0, 5.0);
        assert!(!m.contains(10, 10));
        assert!(m.contains(10, 6));
        assert!(!m.contains(10, 3));
    }

    #[test]
    fn source_over_opaque_replaces() {
        let mut c = Canvas::new(2, 1);
        let m = Mask::full(2, 1);
        c.fill_mask(&m, Rgba([10, 20, 30, 255]));
        c.fill_mask(&m, Rgba([1, 2, 3, 255]));
        assert_eq!(c.pixel(0, 0), Some(Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn destination_over_keeps_existing_on_top() {
        let mut c = Canvas::new(1, 1);
        let m = Mask::full(1, 1);
        c.fill_mask(&m, Rgba([255, 0, 0, 255]));
        c.composite = Composite::DestinationOver;
        c.fill_mask(&m, Rgba([0, 0, 255, 255]));
        assert_eq!(c.pixel(0, 0), Some(Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn clear_then_draw_does_not_accumulate_alpha() {
        let mut c = Canvas::new(1, 1);
        let m = Mask::full(1, 1);
        let src = RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255]));
        for _ in 0..3 {
            c.composite = Composite::DestinationOut;
            c.global_alpha = 1.0;
            c.fill_mask(&m, Rgba([0, 0, 0, 255]));
            c.composite = Composite::SourceOver;
            c.global_alpha = 0.5;
            c.draw_image(&src, 0, 0, 1, 1);
        }
        assert_eq!(c.pixel(0, 0), Some(Rgba([0, 255, 0, 128])));
    }

    #[test]
    fn clip_limits_image_draw() {
        let mut c = Canvas::new(4, 1);
        let mut clip = Mask::new(4, 1);
        clip.add_span(0, 1, 3);
        c.set_clip(Some(clip));
        let src = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        c.draw_image(&src, 0, 0, 4, 1);
        assert_eq!(c.pixel(0, 0), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(c.pixel(1, 0), Some(Rgba([9, 9, 9, 255])));
        assert_eq!(c.pixel(3, 0), Some(Rgba([0, 0, 0, 0])));
    }
}
