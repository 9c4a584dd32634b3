use crate::core::gfx::{stop, Backend, LinearGradient, Point, Rect};
use crate::core::space::Viewport;
use crate::error::RenderWarning;
use crate::ui::color;
use rand::rngs::StdRng;
use rand::Rng;

/* ----------------------- layout ----------------------- */
const ROAD_TOP: f32 = 0.7; // fraction of viewport height
const NEAR_PLANE: f32 = 1.0;
const DEPTH_JITTER: f32 = 100.0;
const TRAVEL: f32 = 0.8; // how far down the road plane a mark travels

/* ----------------------- dashes ----------------------- */
const DASH_GROWTH: f32 = 40.0;
const DASH_MIN_HEIGHT: f32 = 2.0;
const DASH_HEIGHT_GROWTH: f32 = 8.0;
const DASH_MAX_ALPHA: f32 = 0.5;
const DASH_COLOR: color::Rgb = [255, 215, 0];
const SURFACE_COLOR: color::Rgb = [30, 30, 50];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoadMark {
    pub z: f32,
    /// Narrowest dash width, at the far plane.
    pub width: f32,
}

/// Centre-line dashes on a road plane across the lower viewport.
/// Marks drift slower than the particles, which reads as parallax.
pub struct RoadOverlay {
    marks: Vec<RoadMark>,
    damping: f32,
    visible_speed: f32,
}

impl RoadOverlay {
    pub fn new(count: usize, damping: f32, visible_speed: f32, viewport: &Viewport, rng: &mut StdRng) -> Self {
        let marks = (0..count)
            .map(|i| RoadMark {
                z: (i as f32 / count as f32) * viewport.width() + rng.random::<f32>() * DEPTH_JITTER,
                width: 4.0 + rng.random::<f32>() * 3.0,
            })
            .collect();
        Self { marks, damping, visible_speed }
    }

    #[inline(always)] pub fn marks(&self) -> &[RoadMark] { &self.marks }

    #[cfg(test)]
    pub(crate) fn marks_mut(&mut self) -> &mut [RoadMark] {
        &mut self.marks
    }

    /// The road only shows once the car is moving fast enough.
    #[inline(always)]
    pub fn is_visible(&self, speed: f32) -> bool {
        speed > self.visible_speed
    }

    pub fn advance(&mut self, speed: f32, viewport: &Viewport) {
        let step = speed * self.damping;
        for m in self.marks.iter_mut() {
            m.z -= step;
            if m.z < NEAR_PLANE {
                m.z = viewport.width();
            }
        }
    }

    pub fn render(&self, backend: &mut Backend, viewport: &Viewport) -> Vec<RenderWarning> {
        let mut warnings = Vec::new();
        let (w, h) = (viewport.width(), viewport.height());
        let top = h * ROAD_TOP;
        let depth = h - top;

        let surface = LinearGradient {
            start: Point::new(0.0, top),
            end: Point::new(0.0, h),
            stops: vec![
                stop(0.0, color::rgba(SURFACE_COLOR, 0.0)),
                stop(0.3, color::rgba(SURFACE_COLOR, 0.3)),
                stop(1.0, color::rgba(SURFACE_COLOR, 0.6)),
            ],
        };
        if let Err(reason) = backend.fill_linear_gradient(Rect::new(0.0, top, w, depth), &surface) {
            warnings.push(RenderWarning::Surface { element: "road surface", index: 0, reason });
        }

        for (index, m) in self.marks.iter().enumerate() {
            let Some(rect) = dash_rect(m, viewport) else {
                if !m.z.is_finite() {
                    warnings.push(RenderWarning::NonFiniteProjection { element: "road mark", index });
                }
                continue;
            };
            let alpha = nearness(m, viewport) * DASH_MAX_ALPHA;
            if let Err(reason) = backend.fill_rect(rect, color::rgba(DASH_COLOR, alpha)) {
                warnings.push(RenderWarning::Surface { element: "road mark", index, reason });
            }
        }
        warnings
    }
}

/// 0 at the far plane, approaching 1 at the viewer.
#[inline(always)]
fn nearness(m: &RoadMark, viewport: &Viewport) -> f32 {
    1.0 - m.z / viewport.width()
}

/// Perspective-correct dash; `None` when the mark is beyond the far plane or not finite.
pub fn dash_rect(m: &RoadMark, viewport: &Viewport) -> Option<Rect> {
    let p = nearness(m, viewport);
    if !p.is_finite() || p <= 0.0 {
        return None;
    }
    let top = viewport.height() * ROAD_TOP;
    let y = top + (viewport.height() - top) * p * TRAVEL;
    let dash_w = 0.5 * m.width + p * DASH_GROWTH;
    let dash_h = DASH_MIN_HEIGHT + p * DASH_HEIGHT_GROWTH;
    Some(Rect::new(viewport.center_x() - 0.5 * dash_w, y, dash_w, dash_h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gfx::{DrawCommand, Recorder};
    use rand::SeedableRng;

    fn viewport() -> Viewport {
        Viewport::new(1000, 500).unwrap()
    }

    fn overlay() -> RoadOverlay {
        RoadOverlay::new(15, 0.7, 5.0, &viewport(), &mut StdRng::seed_from_u64(3))
    }

    #[test]
    fn marks_are_spread_along_depth() {
        let road = overlay();
        assert_eq!(road.marks().len(), 15);
        for (i, m) in road.marks().iter().enumerate() {
            let base = i as f32 / 15.0 * 1000.0;
            assert!(m.z >= base && m.z < base + DEPTH_JITTER);
            assert!(m.width >= 4.0 && m.width < 7.0);
        }
    }

    #[test]
    fn gate_is_strictly_above_threshold() {
        let road = overlay();
        assert!(!road.is_visible(5.0));
        assert!(road.is_visible(5.01));
    }

    #[test]
    fn marks_move_slower_than_speed_and_wrap() {
        let v = viewport();
        let mut road = overlay();
        let before = road.marks()[5].z;
        road.advance(10.0, &v);
        assert!((before - road.marks()[5].z - 7.0).abs() < 1e-3);

        road.advance(before, &v);
        assert!(road.marks().iter().all(|m| m.z >= NEAR_PLANE));
        assert!(road.marks().iter().any(|m| m.z == v.width()));
    }

    #[test]
    fn closer_dashes_are_lower_wider_taller() {
        let v = viewport();
        let far = dash_rect(&RoadMark { z: 800.0, width: 5.0 }, &v).unwrap();
        let near = dash_rect(&RoadMark { z: 100.0, width: 5.0 }, &v).unwrap();
        assert!(near.y > far.y);
        assert!(near.w > far.w);
        assert!(near.h > far.h);
        assert!(dash_rect(&RoadMark { z: 1050.0, width: 5.0 }, &v).is_none());
    }

    #[test]
    fn render_draws_surface_then_dashes() {
        let v = viewport();
        let road = overlay();
        let mut backend = Backend::Recorder(Recorder::new(1000, 500));
        assert!(road.render(&mut backend, &v).is_empty());
        let cmds = backend.as_recorder().unwrap().commands();
        assert!(matches!(cmds[0], DrawCommand::LinearGradient(r, _) if r.y == 350.0 && r.h == 150.0));
        let dashes = road.marks().iter().filter(|m| dash_rect(m, &v).is_some()).count();
        assert_eq!(cmds.len(), 1 + dashes);
    }
}
