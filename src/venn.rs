use std::f64::consts::PI;
use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use log::{debug, info, warn};

use crate::color::{blend, generate_palette};

/// Smallest diagram edge that still leaves room for labels.
pub const MIN_SIZE: u32 = 100;
/// Largest diagram edge; the canvas is held in memory as RGBA.
pub const MAX_SIZE: u32 = 10_000;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([40, 40, 40, 255]);
const FILL_ALPHA: f32 = 0.4;
const MARGIN: f64 = 0.12;

#[derive(Debug, thiserror::Error)]
pub enum VennError {
    #[error("diagram size {0}px is below the minimum of {}px", MIN_SIZE)]
    TooSmall(u32),

    #[error("diagram size {0}px is above the maximum of {}px", MAX_SIZE)]
    TooLarge(u32),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    fn contains(&self, x: f64, y: f64) -> bool {
        (x - self.x).powi(2) + (y - self.y).powi(2) <= self.r * self.r
    }

    /// Signed distance from the outline, negative inside.
    fn edge(&self, x: f64, y: f64) -> f64 {
        ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt() - self.r
    }
}

/// Area shared by two circles with centres `d` apart.
pub fn lens_area(r1: f64, r2: f64, d: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        return PI * r1.min(r2).powi(2);
    }
    let a1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let a2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let k = ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2)).max(0.0);
    r1 * r1 * a1 + r2 * r2 * a2 - 0.5 * k.sqrt()
}

/// Centre distance at which two circles overlap by `target` area.
pub fn solve_distance(r1: f64, r2: f64, target: f64) -> f64 {
    let (lo, hi) = ((r1 - r2).abs(), r1 + r2);
    if r1 <= 0.0 || r2 <= 0.0 || target <= 0.0 {
        return hi;
    }
    if target >= PI * r1.min(r2).powi(2) {
        return lo;
    }
    // lens area shrinks monotonically as the circles move apart
    let (mut lo, mut hi) = (lo, hi);
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if lens_area(r1, r2, mid) > target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Area-proportional placement of A (peaklist1), B (expression) and
/// C (peaklist2) from region sizes in `venn3` order.
///
/// Set areas are exact; pairwise overlaps are exact when the three centre
/// distances form a triangle, otherwise C is pulled onto the A–B axis.
pub fn layout(regions: &[u64; 7]) -> [Circle; 3] {
    let r = (*regions).map(|v| v as f64);
    let sizes = [
        r[0] + r[2] + r[4] + r[6],
        r[1] + r[2] + r[5] + r[6],
        r[3] + r[4] + r[5] + r[6],
    ];
    let radius = sizes.map(|s| (s / PI).sqrt());

    let d_ab = solve_distance(radius[0], radius[1], r[2] + r[6]);
    let d_ac = solve_distance(radius[0], radius[2], r[4] + r[6]);
    let d_bc = solve_distance(radius[1], radius[2], r[5] + r[6]);

    let (cx, cy) = if d_ab > f64::EPSILON {
        let x = (d_ac * d_ac - d_bc * d_bc + d_ab * d_ab) / (2.0 * d_ab);
        let y2 = d_ac * d_ac - x * x;
        if y2 < 0.0 {
            debug!("overlap distances do not form a triangle; flattening layout");
        }
        (x, y2.max(0.0).sqrt())
    } else {
        (0.0, d_ac)
    };

    [
        Circle { x: 0.0, y: 0.0, r: radius[0] },
        Circle { x: d_ab, y: 0.0, r: radius[1] },
        Circle { x: cx, y: cy, r: radius[2] },
    ]
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Clamp negative region sizes to zero, warning about each one.
pub fn clamp_regions(regions: &[i64; 7]) -> [u64; 7] {
    const NAMES: [&str; 7] = ["Abc", "aBc", "ABc", "abC", "AbC", "aBC", "ABC"];
    let mut out = [0u64; 7];
    for (i, &v) in regions.iter().enumerate() {
        if v < 0 {
            warn!("region {} has negative size {v}; drawing it as 0", NAMES[i]);
        }
        out[i] = v.max(0) as u64;
    }
    out
}

/// Scale and centre the drawn circles onto a `size`×`size` canvas.
fn fit(circles: &[Circle; 3], size: u32) -> [Circle; 3] {
    let drawn: Vec<&Circle> = circles.iter().filter(|c| c.r > 0.0).collect();
    let min_x = drawn.iter().map(|c| c.x - c.r).fold(f64::INFINITY, f64::min);
    let max_x = drawn.iter().map(|c| c.x + c.r).fold(f64::NEG_INFINITY, f64::max);
    let min_y = drawn.iter().map(|c| c.y - c.r).fold(f64::INFINITY, f64::min);
    let max_y = drawn.iter().map(|c| c.y + c.r).fold(f64::NEG_INFINITY, f64::max);
    let margin = size as f64 * MARGIN;
    let scale = (size as f64 - 2.0 * margin) / (max_x - min_x).max(max_y - min_y);
    let off_x = (size as f64 - (max_x - min_x) * scale) / 2.0 - min_x * scale;
    let off_y = (size as f64 - (max_y - min_y) * scale) / 2.0 - min_y * scale;
    (*circles).map(|c| Circle {
        x: c.x * scale + off_x,
        y: c.y * scale + off_y,
        r: c.r * scale,
    })
}

/// Membership mask of a point: bit `i` is set when circle `i` contains it.
fn membership(circles: &[Circle; 3], x: f64, y: f64) -> usize {
    circles
        .iter()
        .enumerate()
        .filter(|(_, c)| c.r > 0.0 && c.contains(x, y))
        .fold(0, |mask, (i, _)| mask | 1 << i)
}

/// For every membership mask, the pixel centre farthest from any outline.
///
/// Regions are bounded by circle arcs, so this pixel lies inside its region
/// even when the region is a thin crescent.
fn region_anchors(circles: &[Circle; 3], size: u32) -> [Option<(f64, f64)>; 8] {
    let mut best: [Option<(f64, f64, f64)>; 8] = [None; 8];
    for y in 0..size {
        for x in 0..size {
            let (fx, fy) = (x as f64 + 0.5, y as f64 + 0.5);
            let mask = membership(circles, fx, fy);
            if mask == 0 {
                continue;
            }
            let depth = circles
                .iter()
                .filter(|c| c.r > 0.0)
                .map(|c| c.edge(fx, fy).abs())
                .fold(f64::INFINITY, f64::min);
            if best[mask].map_or(true, |(d, _, _)| depth > d) {
                best[mask] = Some((depth, fx, fy));
            }
        }
    }
    best.map(|b| b.map(|(_, x, y)| (x, y)))
}

/// Centre for each set label, just outside its circle and pointing away
/// from the middle of the diagram.
fn set_label_anchors(circles: &[Circle; 3], labels: &[&str; 3], scale: u32) -> [Option<(f64, f64)>; 3] {
    // used when the centres coincide: A up-left, B up-right, C below
    const FALLBACK: [(f64, f64); 3] = [(-0.6, -0.8), (0.6, -0.8), (0.0, 1.0)];

    let drawn: Vec<&Circle> = circles.iter().filter(|c| c.r > 0.0).collect();
    let n = drawn.len().max(1) as f64;
    let mx = drawn.iter().map(|c| c.x).sum::<f64>() / n;
    let my = drawn.iter().map(|c| c.y).sum::<f64>() / n;
    let pad = scale as f64 * 2.0;

    let mut anchors = [None; 3];
    for (i, (c, label)) in circles.iter().zip(labels).enumerate() {
        if c.r <= 0.0 || label.is_empty() {
            continue;
        }
        let (dx, dy) = (c.x - mx, c.y - my);
        let len = (dx * dx + dy * dy).sqrt();
        let (ux, uy) = if len > 1e-6 { (dx / len, dy / len) } else { FALLBACK[i] };
        let (w, h) = text_extent(label, scale);
        let reach = c.r + pad + ux.abs() * w / 2.0 + uy.abs() * h / 2.0;
        anchors[i] = Some((c.x + ux * reach, c.y + uy * reach));
    }
    anchors
}

/// Draw the three-set diagram on a `size`×`size` canvas, captioning circles
/// A, B and C with `labels`.
pub fn render(regions: &[i64; 7], labels: &[&str; 3], size: u32) -> Result<RgbaImage, VennError> {
    if size < MIN_SIZE {
        return Err(VennError::TooSmall(size));
    }
    if size > MAX_SIZE {
        return Err(VennError::TooLarge(size));
    }
    let regions = clamp_regions(regions);
    let mut img = RgbaImage::from_pixel(size, size, WHITE);

    let circles = layout(&regions);
    if circles.iter().all(|c| c.r <= 0.0) {
        warn!("all sets are empty; writing a blank diagram");
        return Ok(img);
    }
    let px = fit(&circles, size);

    let palette = generate_palette(3);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let (fx, fy) = (x as f64 + 0.5, y as f64 + 0.5);
        let mut colour = WHITE;
        for (i, c) in px.iter().enumerate() {
            if c.r > 0.0 && c.contains(fx, fy) {
                colour = blend(colour, palette[i], FILL_ALPHA);
            }
        }
        for c in px.iter().filter(|c| c.r > 0.0) {
            let edge = c.edge(fx, fy).abs();
            if edge < 1.0 {
                colour = blend(colour, INK, 1.0 - edge as f32);
            }
        }
        *pixel = colour;
    }

    let glyph_scale = (size / 150).max(1);
    let anchors = region_anchors(&px, size);
    for mask in 1..8 {
        let count = regions[mask - 1];
        if count == 0 {
            continue;
        }
        match anchors[mask] {
            Some((cx, cy)) => draw_text(&mut img, &count.to_string(), cx, cy, glyph_scale),
            None => debug!("region {mask} too small to label ({count})"),
        }
    }

    for (label, anchor) in labels.iter().zip(set_label_anchors(&px, labels, glyph_scale)) {
        if let Some((cx, cy)) = anchor {
            draw_text(&mut img, label, cx, cy, glyph_scale);
        }
    }

    Ok(img)
}

/// Render and save the diagram as PNG.
pub fn write_png(regions: &[i64; 7], labels: &[&str; 3], size: u32, path: &Path) -> Result<(), VennError> {
    let img = render(regions, labels, size)?;
    img.save_with_format(path, ImageFormat::Png)?;
    info!("wrote diagram to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// 3×5 bitmap glyphs, one row per byte, high bit on the left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

const LETTERS: [[u8; 5]; 26] = [
    [0b010, 0b101, 0b111, 0b101, 0b101], // A
    [0b110, 0b101, 0b110, 0b101, 0b110],
    [0b011, 0b100, 0b100, 0b100, 0b011],
    [0b110, 0b101, 0b101, 0b101, 0b110],
    [0b111, 0b100, 0b110, 0b100, 0b111],
    [0b111, 0b100, 0b110, 0b100, 0b100],
    [0b011, 0b100, 0b101, 0b101, 0b011],
    [0b101, 0b101, 0b111, 0b101, 0b101],
    [0b111, 0b010, 0b010, 0b010, 0b111],
    [0b001, 0b001, 0b001, 0b101, 0b010],
    [0b101, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111],
    [0b101, 0b111, 0b111, 0b101, 0b101], // M
    [0b110, 0b101, 0b101, 0b101, 0b101],
    [0b010, 0b101, 0b101, 0b101, 0b010],
    [0b110, 0b101, 0b110, 0b100, 0b100],
    [0b010, 0b101, 0b101, 0b110, 0b011],
    [0b110, 0b101, 0b110, 0b101, 0b101],
    [0b011, 0b100, 0b010, 0b001, 0b110],
    [0b111, 0b010, 0b010, 0b010, 0b010],
    [0b101, 0b101, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b101, 0b101, 0b010],
    [0b101, 0b101, 0b111, 0b111, 0b101],
    [0b101, 0b101, 0b010, 0b101, 0b101],
    [0b101, 0b101, 0b010, 0b010, 0b010],
    [0b111, 0b001, 0b010, 0b100, 0b111], // Z
];

/// Glyph for `ch`; letters are drawn upper-case, anything unknown as `?`.
fn glyph(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        d @ '0'..='9' => DIGITS[d as usize - '0' as usize],
        c @ 'A'..='Z' => LETTERS[c as usize - 'A' as usize],
        ' ' => [0; 5],
        '.' => [0, 0, 0, 0, 0b010],
        '_' => [0, 0, 0, 0, 0b111],
        '-' => [0, 0, 0b111, 0, 0],
        '+' => [0, 0b010, 0b111, 0b010, 0],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        _ => [0b111, 0b001, 0b010, 0, 0b010],
    }
}

/// Pixel width and height of `text` at `scale`.
fn text_extent(text: &str, scale: u32) -> (f64, f64) {
    let chars = text.chars().count() as f64;
    let scale = scale as f64;
    ((chars * 4.0 - 1.0).max(0.0) * scale, 5.0 * scale)
}

/// Draw `text` centred on (`cx`, `cy`), kept on the canvas when it fits and
/// clipped at the edge otherwise.
fn draw_text(img: &mut RgbaImage, text: &str, cx: f64, cy: f64, scale: u32) {
    let (w, h) = text_extent(text, scale);
    let (width, height) = (img.width() as f64, img.height() as f64);
    let cx = if w < width { cx.clamp(w / 2.0, width - w / 2.0) } else { cx };
    let cy = if h < height { cy.clamp(h / 2.0, height - h / 2.0) } else { cy };

    let scale = scale as i64;
    let advance = 4 * scale;
    let left = (cx - w / 2.0).round() as i64;
    let top = (cy - h / 2.0).round() as i64;

    for (n, ch) in text.chars().enumerate() {
        let gx = left + n as i64 * advance;
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = gx + col * scale + dx;
                        let y = top + row as i64 * scale + dy;
                        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
                            img.put_pixel(x as u32, y as u32, INK);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    #[rstest]
    #[case(1.0, 1.0, 2.5, 0.0)]
    #[case(2.0, 1.0, 0.5, PI)]
    fn test_lens_area_limits(#[case] r1: f64, #[case] r2: f64, #[case] d: f64, #[case] expected: f64) {
        assert!(close(lens_area(r1, r2, d), expected));
    }

    #[rstest]
    #[case(1.0, 1.0, 0.5)]
    #[case(3.0, 1.5, 2.0)]
    #[case(2.0, 2.5, 0.01)]
    fn test_solve_distance_hits_target(#[case] r1: f64, #[case] r2: f64, #[case] target: f64) {
        let d = solve_distance(r1, r2, target);
        assert!(close(lens_area(r1, r2, d), target));
    }

    #[rstest]
    fn test_layout_areas_follow_set_sizes() {
        let circles = layout(&[10, 0, 0, 40, 0, 0, 0]);
        assert!(close(PI * circles[0].r.powi(2), 10.0));
        assert_eq!(circles[1].r, 0.0);
        assert!(close(PI * circles[2].r.powi(2), 40.0));
    }

    #[rstest]
    fn test_identical_sets_share_a_centre() {
        let circles = layout(&[0, 0, 0, 0, 0, 0, 25]);
        assert!(close(circles[0].x, circles[1].x));
        assert!(close(circles[0].x, circles[2].x));
        assert!(close(circles[0].y, circles[2].y));
    }

    #[rstest]
    fn test_clamp_regions() {
        assert_eq!(clamp_regions(&[3, -2, 0, 1, -1, 0, 5]), [3, 0, 0, 1, 0, 0, 5]);
    }

    const NO_LABELS: [&str; 3] = ["", "", ""];

    /// Ink pixels lying clear of every circle outline.
    fn ink_outside(img: &RgbaImage, circles: &[Circle; 3]) -> usize {
        img.enumerate_pixels()
            .filter(|(x, y, p)| {
                let (fx, fy) = (*x as f64 + 0.5, *y as f64 + 0.5);
                **p == INK && circles.iter().all(|c| c.r <= 0.0 || c.edge(fx, fy) > 1.5)
            })
            .count()
    }

    #[rstest]
    fn test_render_fills_disjoint_circles() {
        let regions = [5, 5, 0, 5, 0, 0, 0];
        let img = render(&regions, &NO_LABELS, 300).unwrap();
        assert_eq!(img.dimensions(), (300, 300));
        let circles = layout(&clamp_regions(&regions));
        assert!(circles.iter().all(|c| c.r > 0.0));
        // corner stays background
        assert_eq!(*img.get_pixel(0, 0), WHITE);
        assert!(img.pixels().any(|p| *p != WHITE));
    }

    #[rstest]
    fn test_set_labels_are_drawn_outside_the_circles() {
        let regions = [5, 5, 0, 5, 0, 0, 0];
        let px = fit(&layout(&clamp_regions(&regions)), 300);

        let plain = render(&regions, &NO_LABELS, 300).unwrap();
        assert_eq!(ink_outside(&plain, &px), 0);

        let labelled = render(&regions, &["p1.csv", "rna.csv", "p2.csv"], 300).unwrap();
        assert!(ink_outside(&labelled, &px) > 0);

        for anchor in set_label_anchors(&px, &["p1.csv", "rna.csv", "p2.csv"], 2) {
            let (x, y) = anchor.unwrap();
            assert_eq!(membership(&px, x, y), 0);
        }
    }

    #[rstest]
    fn test_region_anchor_stays_inside_thin_crescent() {
        // A and B nearly coincide, leaving thin A-only and B-only crescents
        let px = fit(&layout(&[1, 1, 60, 0, 0, 0, 0]), 300);
        let anchors = region_anchors(&px, 300);
        for mask in [0b001, 0b010, 0b011] {
            let (x, y) = anchors[mask].unwrap();
            assert_eq!(membership(&px, x, y), mask);
        }
        assert!(anchors[0b100].is_none());
    }

    #[rstest]
    fn test_glyphs() {
        assert_eq!(glyph('a'), glyph('A'));
        assert_eq!(glyph('7'), DIGITS[7]);
        assert_eq!(glyph('~'), glyph('?'));
        assert_eq!(glyph(' '), [0; 5]);
    }

    #[rstest]
    fn test_render_empty_sets_is_blank() {
        let img = render(&[0; 7], &["a", "b", "c"], 120).unwrap();
        assert!(img.pixels().all(|p| *p == WHITE));
    }

    #[rstest]
    #[case(10)]
    #[case(MAX_SIZE + 1)]
    fn test_render_rejects_canvas_out_of_range(#[case] size: u32) {
        let err = render(&[1; 7], &NO_LABELS, size).unwrap_err();
        assert!(matches!(err, VennError::TooSmall(s) | VennError::TooLarge(s) if s == size));
    }

    #[rstest]
    fn test_write_png() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("peaks_DEG.png");
        write_png(&[4, -1, 2, 3, 1, 1, 6], &["a.csv", "c.csv", "b.csv"], 200, &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (200, 200));
    }

    #[rstest]
    fn test_draw_text_stays_on_canvas() {
        let mut img = RgbaImage::from_pixel(20, 20, WHITE);
        // pulled in from the corner so the whole glyph shows
        draw_text(&mut img, "8", 0.0, 0.0, 1);
        assert_eq!(*img.get_pixel(0, 0), INK);
        assert_eq!(*img.get_pixel(2, 4), INK);
        // wider than the canvas: clipped, not shifted
        draw_text(&mut img, "1234567890", 10.0, 10.0, 3);
    }
}
