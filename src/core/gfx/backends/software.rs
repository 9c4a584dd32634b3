// src/core/gfx/backends/software.rs
//! CPU rasterizer over an `image::RgbaImage`.
//!
//! Straight-alpha "source over" blending, coverage anti-aliasing on strokes,
//! per-pixel gradient evaluation. Slow but dependency-free beyond `image`, and
//! exact enough to dump intro frames as PNGs.
use crate::core::gfx::{sample_stops, LinearGradient, RadialGradient, Rect, Stroke};
use crate::ui::color::{Rgba, BLACK};
use cgmath::{InnerSpace, MetricSpace, Vector2};
use image::{Rgba as Pixel, RgbaImage};
use log::{debug, info};
use std::path::Path;

pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        info!("Software canvas {}x{}", width, height);
        let mut canvas = Self { image: RgbaImage::new(width.max(1), height.max(1)) };
        canvas.fill_all(BLACK);
        canvas
    }

    #[inline(always)]
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[inline(always)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Resizing drops the old contents; the next frame repaints everything.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.size() || width == 0 || height == 0 {
            return;
        }
        debug!("Software canvas resized to {}x{}", width, height);
        self.image = RgbaImage::new(width, height);
        self.fill_all(BLACK);
    }

    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image.save_with_format(path, image::ImageFormat::Png)
    }

    // --- primitives ---

    /// Replaces every pixel; no blending.
    pub fn clear(&mut self, color: Rgba) -> Result<(), String> {
        check_color(color)?;
        self.fill_all(color);
        Ok(())
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) -> Result<(), String> {
        check_rect(rect)?;
        check_color(color)?;
        if color[3] <= 0.0 {
            return Ok(());
        }
        let Some((x0, y0, x1, y1)) = self.clip(rect.x, rect.y, rect.x + rect.w, rect.y + rect.h) else {
            return Ok(());
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color, 1.0);
            }
        }
        Ok(())
    }

    pub fn fill_linear_gradient(&mut self, rect: Rect, gradient: &LinearGradient) -> Result<(), String> {
        check_rect(rect)?;
        let start = Vector2::new(gradient.start.x, gradient.start.y);
        let axis = Vector2::new(gradient.end.x, gradient.end.y) - start;
        let len2 = axis.magnitude2();
        if !len2.is_finite() {
            return Err("linear gradient axis is not finite".to_string());
        }
        let Some((x0, y0, x1, y1)) = self.clip(rect.x, rect.y, rect.x + rect.w, rect.y + rect.h) else {
            return Ok(());
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vector2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len2 <= f32::EPSILON { 0.0 } else { (p - start).dot(axis) / len2 };
                let color = sample_stops(&gradient.stops, t.clamp(0.0, 1.0));
                self.blend(x, y, color, 1.0);
            }
        }
        Ok(())
    }

    pub fn fill_radial_gradient(&mut self, rect: Rect, gradient: &RadialGradient) -> Result<(), String> {
        check_rect(rect)?;
        let center = Vector2::new(gradient.center.x, gradient.center.y);
        let span = gradient.outer_radius - gradient.inner_radius;
        if !span.is_finite() || !center.x.is_finite() || !center.y.is_finite() {
            return Err("radial gradient geometry is not finite".to_string());
        }
        let Some((x0, y0, x1, y1)) = self.clip(rect.x, rect.y, rect.x + rect.w, rect.y + rect.h) else {
            return Ok(());
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let d = Vector2::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
                let t = if span.abs() <= f32::EPSILON {
                    if d <= gradient.inner_radius { 0.0 } else { 1.0 }
                } else {
                    (d - gradient.inner_radius) / span
                };
                let color = sample_stops(&gradient.stops, t.clamp(0.0, 1.0));
                self.blend(x, y, color, 1.0);
            }
        }
        Ok(())
    }

    pub fn stroke_line(&mut self, stroke: &Stroke) -> Result<(), String> {
        check_color(stroke.color)?;
        let a = Vector2::new(stroke.from.x, stroke.from.y);
        let b = Vector2::new(stroke.to.x, stroke.to.y);
        if ![a.x, a.y, b.x, b.y, stroke.width].iter().all(|v| v.is_finite()) {
            return Err("stroke geometry is not finite".to_string());
        }
        if stroke.width <= 0.0 || stroke.color[3] <= 0.0 {
            return Ok(());
        }

        let half = 0.5 * stroke.width;
        let pad = half + 1.0;
        let Some((x0, y0, x1, y1)) = self.clip(
            a.x.min(b.x) - pad,
            a.y.min(b.y) - pad,
            a.x.max(b.x) + pad,
            a.y.max(b.y) + pad,
        ) else {
            return Ok(());
        };

        let ab = b - a;
        let len2 = ab.magnitude2();
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vector2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len2 <= f32::EPSILON { 0.0 } else { ((p - a).dot(ab) / len2).clamp(0.0, 1.0) };
                let d = p.distance(a + ab * t);
                // sub-pixel lines keep their thinness as reduced coverage
                let coverage = (half + 0.5 - d).clamp(0.0, 1.0) * stroke.width.min(1.0);
                if coverage > 0.0 {
                    self.blend(x, y, stroke.color, coverage);
                }
            }
        }
        Ok(())
    }

    // --- internals ---

    fn fill_all(&mut self, color: Rgba) {
        let px = Pixel(to_u8(color));
        for p in self.image.pixels_mut() {
            *p = px;
        }
    }

    /// Integer pixel bounds of a float box, clipped to the canvas. `None` if empty.
    fn clip(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = self.size();
        let cx0 = x0.floor().max(0.0);
        let cy0 = y0.floor().max(0.0);
        let cx1 = x1.ceil().min(w as f32);
        let cy1 = y1.ceil().min(h as f32);
        if cx0 >= cx1 || cy0 >= cy1 {
            return None;
        }
        Some((cx0 as u32, cy0 as u32, cx1 as u32, cy1 as u32))
    }

    #[inline(always)]
    fn blend(&mut self, x: u32, y: u32, src: Rgba, coverage: f32) {
        let a = (src[3] * coverage).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let dst = self.image.get_pixel_mut(x, y);
        let [dr, dg, db, da] = dst.0;
        let mix = |s: f32, d: u8| -> u8 {
            let d = d as f32 / 255.0;
            ((s.clamp(0.0, 1.0) * a + d * (1.0 - a)) * 255.0).round() as u8
        };
        let out_a = a + (da as f32 / 255.0) * (1.0 - a);
        dst.0 = [
            mix(src[0], dr),
            mix(src[1], dg),
            mix(src[2], db),
            (out_a * 255.0).round() as u8,
        ];
    }
}

#[inline(always)]
fn to_u8(c: Rgba) -> [u8; 4] {
    c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn check_color(c: Rgba) -> Result<(), String> {
    if c.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(format!("colour {:?} is not finite", c))
    }
}

fn check_rect(r: Rect) -> Result<(), String> {
    if r.is_finite() {
        Ok(())
    } else {
        Err(format!("rectangle {:?} is not finite", r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gfx::{stop, Point};

    #[test]
    fn new_canvas_is_opaque_black() {
        let c = Canvas::new(4, 4);
        assert_eq!(c.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(c.pixel(3, 3), [0, 0, 0, 255]);
    }

    #[test]
    fn fill_rect_blends_and_clips() {
        let mut c = Canvas::new(4, 4);
        c.fill_rect(Rect::new(-10.0, -10.0, 12.0, 12.0), [1.0, 1.0, 1.0, 0.5]).unwrap();
        assert_eq!(c.pixel(0, 0), [128, 128, 128, 255]);
        assert_eq!(c.pixel(1, 1), [128, 128, 128, 255]);
        assert_eq!(c.pixel(2, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn translucent_black_fades_previous_frame() {
        let mut c = Canvas::new(2, 2);
        c.clear([1.0, 1.0, 1.0, 1.0]).unwrap();
        c.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), [0.0, 0.0, 0.0, 0.85]).unwrap();
        assert_eq!(c.pixel(0, 0)[0], 38);
    }

    #[test]
    fn vertical_linear_gradient_ramps_down() {
        let mut c = Canvas::new(1, 10);
        let g = LinearGradient {
            start: Point::new(0.0, 0.0),
            end: Point::new(0.0, 10.0),
            stops: vec![stop(0.0, [1.0, 0.0, 0.0, 0.0]), stop(1.0, [1.0, 0.0, 0.0, 1.0])],
        };
        c.fill_linear_gradient(Rect::new(0.0, 0.0, 1.0, 10.0), &g).unwrap();
        assert!(c.pixel(0, 0)[0] < c.pixel(0, 5)[0]);
        assert!(c.pixel(0, 5)[0] < c.pixel(0, 9)[0]);
    }

    #[test]
    fn radial_gradient_darkens_edges() {
        let mut c = Canvas::new(21, 21);
        c.clear([1.0, 1.0, 1.0, 1.0]).unwrap();
        let g = RadialGradient {
            center: Point::new(10.5, 10.5),
            inner_radius: 2.0,
            outer_radius: 10.0,
            stops: vec![stop(0.0, [0.0, 0.0, 0.0, 0.0]), stop(1.0, [0.0, 0.0, 0.0, 1.0])],
        };
        c.fill_radial_gradient(Rect::new(0.0, 0.0, 21.0, 21.0), &g).unwrap();
        assert_eq!(c.pixel(10, 10)[0], 255);
        assert_eq!(c.pixel(0, 0)[0], 0);
    }

    #[test]
    fn stroke_covers_pixels_along_segment() {
        let mut c = Canvas::new(20, 5);
        let s = Stroke {
            from: Point::new(2.0, 2.5),
            to: Point::new(18.0, 2.5),
            width: 2.0,
            color: [0.0, 1.0, 0.0, 1.0],
        };
        c.stroke_line(&s).unwrap();
        assert_eq!(c.pixel(10, 2)[1], 255);
        assert_eq!(c.pixel(10, 0)[1], 0);
    }

    #[test]
    fn non_finite_input_is_an_error_not_a_panic() {
        let mut c = Canvas::new(8, 8);
        let s = Stroke {
            from: Point::new(f32::NAN, 0.0),
            to: Point::new(1.0, 1.0),
            width: 1.0,
            color: [1.0; 4],
        };
        assert!(c.stroke_line(&s).is_err());
        assert!(c.fill_rect(Rect::new(0.0, f32::INFINITY, 1.0, 1.0), [1.0; 4]).is_err());
    }
}
