//! Template matching against captured frames
//!
//! Matching is pure and stateless: identical frame/template pairs always
//! yield identical results. Frames are rescaled to the reference width
//! (aspect preserved) before comparison, so a template captured at
//! 1920x1080 still matches an emulator running at 2560x1440.
//!
//! Scores are zero-normalized cross-correlation (the same semantics as
//! OpenCV's `TM_CCOEFF_NORMED`), so flat image areas do not produce
//! spurious high confidences against textured templates.

use image::imageops::{self, FilterType};
use image::GrayImage;

use super::{Frame, MatchResult, Point, Region, Template};

/// Minimum pixel variance for a window or template to be comparable
const VARIANCE_EPSILON: f64 = 1e-6;

/// Locates templates in frames, normalizing for resolution differences
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    reference_width: u32,
}

impl Matcher {
    /// Create a matcher for templates captured at the given reference width
    pub fn new(reference_width: u32) -> Self {
        Self { reference_width }
    }

    /// Search a frame for a single template
    ///
    /// Never fails: degenerate inputs (empty images, template larger than
    /// the searchable area) yield a not-found result with confidence 0.
    pub fn find(&self, frame: &Frame, template: &Template) -> MatchResult {
        let Some(search) = self.normalized_frame(frame) else {
            return MatchResult::not_found(&template.name);
        };
        self.match_in(&search, template)
    }

    /// Search a frame for several templates, returning the first that
    /// clears its threshold (list order is declaration priority)
    ///
    /// When none matches, the result carries the best confidence seen so
    /// callers can log near-misses.
    pub fn find_any(&self, frame: &Frame, templates: &[&Template]) -> MatchResult {
        let Some(search) = self.normalized_frame(frame) else {
            let name = templates.first().map(|t| t.name.as_str()).unwrap_or("");
            return MatchResult::not_found(name);
        };

        let mut best: Option<MatchResult> = None;
        for template in templates {
            let result = self.match_in(&search, template);
            if result.found {
                return result;
            }
            let better = best
                .as_ref()
                .map(|b| result.confidence > b.confidence)
                .unwrap_or(true);
            if better {
                best = Some(result);
            }
        }
        best.unwrap_or_else(|| MatchResult::not_found(""))
    }

    /// Grayscale the frame and rescale it to the reference width,
    /// preserving aspect ratio
    fn normalized_frame(&self, frame: &Frame) -> Option<GrayImage> {
        if frame.width() == 0 || frame.height() == 0 || self.reference_width == 0 {
            return None;
        }
        let gray = imageops::grayscale(frame.image());
        if frame.width() == self.reference_width {
            return Some(gray);
        }
        let scale = self.reference_width as f32 / frame.width() as f32;
        let height = ((frame.height() as f32 * scale).round() as u32).max(1);
        Some(imageops::resize(
            &gray,
            self.reference_width,
            height,
            FilterType::Triangle,
        ))
    }

    fn match_in(&self, search: &GrayImage, template: &Template) -> MatchResult {
        let (full_w, full_h) = search.dimensions();
        let (tw, th) = template.image.dimensions();
        if tw == 0 || th == 0 {
            return MatchResult::not_found(&template.name);
        }

        // Restrict to the configured search region when one is set
        let region = clamp_region(template.region, full_w, full_h);
        let window;
        let (search, off_x, off_y) = match region {
            Some(r) => {
                window = imageops::crop_imm(search, r.x, r.y, r.width, r.height).to_image();
                (&window, r.x, r.y)
            }
            None => (search, 0, 0),
        };

        if tw > search.width() || th > search.height() {
            return MatchResult::not_found(&template.name);
        }

        let Some((best_score, best_x, best_y)) = zncc_best(search, &template.image) else {
            return MatchResult::not_found(&template.name);
        };

        let confidence = (best_score as f32).clamp(0.0, 1.0);
        let found = confidence >= template.threshold;
        let point = Point::new(
            (off_x + best_x + tw / 2) as f32 / full_w as f32,
            (off_y + best_y + th / 2) as f32 / full_h as f32,
        );

        MatchResult {
            found,
            confidence,
            point,
            template_name: template.name.clone(),
        }
    }
}

/// Slide the template over the search image and return the position with
/// the highest zero-normalized cross-correlation score
///
/// Returns `None` when the template has no pixel variance (a flat template
/// cannot be located meaningfully).
fn zncc_best(search: &GrayImage, template: &GrayImage) -> Option<(f64, u32, u32)> {
    let (sw, sh) = search.dimensions();
    let (tw, th) = template.dimensions();
    let n = (tw as f64) * (th as f64);

    let t_pixels: Vec<f64> = template.pixels().map(|p| p[0] as f64).collect();
    let t_sum: f64 = t_pixels.iter().sum();
    let t_mean = t_sum / n;
    let t_var: f64 = t_pixels.iter().map(|v| (v - t_mean) * (v - t_mean)).sum();
    if t_var < VARIANCE_EPSILON {
        return None;
    }
    let t_norm = t_var.sqrt();

    // Summed-area tables over the search image for per-window mean/variance
    let (sat, sat_sq) = integral_tables(search);
    let stride = (sw + 1) as usize;
    let window_sum = |x: u32, y: u32, table: &[f64]| -> f64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + tw as usize, y0 + th as usize);
        table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0]
    };

    let mut best: Option<(f64, u32, u32)> = None;
    for y in 0..=(sh - th) {
        for x in 0..=(sw - tw) {
            let w_sum = window_sum(x, y, &sat);
            let w_sq = window_sum(x, y, &sat_sq);
            let w_var = w_sq - w_sum * w_sum / n;
            if w_var < VARIANCE_EPSILON {
                continue;
            }

            let mut cross = 0.0f64;
            for ty in 0..th {
                for tx in 0..tw {
                    let i = search.get_pixel(x + tx, y + ty)[0] as f64;
                    cross += i * t_pixels[(ty * tw + tx) as usize];
                }
            }

            let score = (cross - w_sum * t_mean) / (w_var.sqrt() * t_norm);
            let better = best.map(|(b, _, _)| score > b).unwrap_or(true);
            if better {
                best = Some((score, x, y));
            }
        }
    }
    best
}

/// Build summed-area tables of pixel values and squared values, each with
/// an extra zero row/column so window sums need no edge cases
fn integral_tables(image: &GrayImage) -> (Vec<f64>, Vec<f64>) {
    let (w, h) = image.dimensions();
    let stride = (w + 1) as usize;
    let len = stride * (h + 1) as usize;
    let mut sat = vec![0.0f64; len];
    let mut sat_sq = vec![0.0f64; len];

    for y in 0..h as usize {
        let mut row_sum = 0.0f64;
        let mut row_sq = 0.0f64;
        for x in 0..w as usize {
            let v = image.get_pixel(x as u32, y as u32)[0] as f64;
            row_sum += v;
            row_sq += v * v;
            let idx = (y + 1) * stride + (x + 1);
            sat[idx] = sat[y * stride + (x + 1)] + row_sum;
            sat_sq[idx] = sat_sq[y * stride + (x + 1)] + row_sq;
        }
    }
    (sat, sat_sq)
}

fn clamp_region(region: Option<Region>, width: u32, height: u32) -> Option<Region> {
    let r = region?;
    if r.x >= width || r.y >= height || r.width == 0 || r.height == 0 {
        return None;
    }
    Some(Region {
        x: r.x,
        y: r.y,
        width: r.width.min(width - r.x),
        height: r.height.min(height - r.y),
    })
}
