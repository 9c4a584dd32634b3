// src/intro/streaks.rs
//! Horizontal speed lines that sweep across the overlay while the car moves.
//!
//! Each streak has a fixed row, length, sweep period and start delay. They
//! are pure functions of elapsed time, so they need no per-frame state.
use crate::core::gfx::{Backend, Point, Stroke};
use crate::core::space::Viewport;
use crate::error::RenderWarning;
use crate::ui::color;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;

pub const STREAK_COUNT: usize = 12;

const MIN_LENGTH: f32 = 100.0;
const LENGTH_RANGE: f32 = 200.0;
const MIN_PERIOD: f32 = 0.3;
const PERIOD_RANGE: f32 = 0.5;
const MAX_DELAY: f32 = 0.3;
const THICKNESS: f32 = 2.0;
const MAX_ALPHA: f32 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Streak {
    /// Row as a fraction of viewport height, in [0, 1).
    pub top: f32,
    /// Length in pixels, in [100, 300).
    pub length: f32,
    /// Seconds per sweep, in [0.3, 0.8).
    pub period: f32,
    /// Seconds before the first sweep, in [0, 0.3).
    pub delay: f32,
}

impl Streak {
    /// Sweep progress in [0, 1) at `t` seconds, `None` before the delay has passed.
    pub fn progress(&self, t: f32) -> Option<f32> {
        if t < self.delay {
            return None;
        }
        Some(((t - self.delay) / self.period).fract())
    }

    /// Right-to-left sweep: enters at the right edge, leaves fully past the left one.
    pub fn stroke(&self, t: f32, viewport: &Viewport) -> Option<Stroke> {
        let p = self.progress(t)?;
        let y = self.top * viewport.height();
        let head = viewport.width() - p * (viewport.width() + self.length);
        // brightest mid-sweep
        let alpha = (1.0 - (2.0 * p - 1.0).abs()) * MAX_ALPHA;
        Some(Stroke {
            from: Point::new(head + self.length, y),
            to: Point::new(head, y),
            width: THICKNESS,
            color: color::rgba([255, 255, 255], alpha),
        })
    }
}

pub struct SpeedStreaks {
    streaks: Vec<Streak>,
}

impl SpeedStreaks {
    pub fn new(count: usize, rng: &mut StdRng) -> Self {
        let streaks = (0..count)
            .map(|_| Streak {
                top: rng.random::<f32>(),
                length: MIN_LENGTH + rng.random::<f32>() * LENGTH_RANGE,
                period: MIN_PERIOD + rng.random::<f32>() * PERIOD_RANGE,
                delay: rng.random::<f32>() * MAX_DELAY,
            })
            .collect();
        Self { streaks }
    }

    #[inline(always)] pub fn streaks(&self) -> &[Streak] { &self.streaks }

    /// `since` is the time the streaks have been running.
    pub fn draw(&self, since: Duration, backend: &mut Backend, viewport: &Viewport) -> Vec<RenderWarning> {
        let t = since.as_secs_f32();
        let mut warnings = Vec::new();
        for (index, streak) in self.streaks.iter().enumerate() {
            let Some(stroke) = streak.stroke(t, viewport) else { continue };
            if let Err(reason) = backend.stroke_line(&stroke) {
                warnings.push(RenderWarning::Surface { element: "speed line", index, reason });
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gfx::Recorder;
    use rand::SeedableRng;

    fn streaks() -> SpeedStreaks {
        SpeedStreaks::new(STREAK_COUNT, &mut StdRng::seed_from_u64(21))
    }

    #[test]
    fn streaks_stay_in_their_ranges() {
        let s = SpeedStreaks::new(500, &mut StdRng::seed_from_u64(4));
        for k in s.streaks() {
            assert!((0.0..1.0).contains(&k.top));
            assert!((100.0..300.0).contains(&k.length));
            assert!((0.3..0.8).contains(&k.period));
            assert!((0.0..0.3).contains(&k.delay));
        }
        assert_eq!(streaks().streaks().len(), 12);
    }

    #[test]
    fn nothing_shows_before_the_delay() {
        let k = Streak { top: 0.5, length: 100.0, period: 0.5, delay: 0.2 };
        assert_eq!(k.progress(0.1), None);
        assert_eq!(k.progress(0.2), Some(0.0));
        assert!((k.progress(0.45).unwrap() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn streak_is_horizontal_and_moves_left() {
        let v = Viewport::new(800, 400).unwrap();
        let k = Streak { top: 0.25, length: 150.0, period: 1.0, delay: 0.0 };
        let early = k.stroke(0.1, &v).unwrap();
        let late = k.stroke(0.6, &v).unwrap();
        assert_eq!(early.from.y, 100.0);
        assert_eq!(early.to.y, 100.0);
        assert!((early.from.x - early.to.x - 150.0).abs() < 1e-3);
        assert!(late.to.x < early.to.x);
    }

    #[test]
    fn draw_strokes_every_started_streak() {
        let v = Viewport::new(800, 400).unwrap();
        let s = streaks();
        let mut backend = Backend::Recorder(Recorder::new(800, 400));
        assert!(s.draw(Duration::from_millis(300), &mut backend, &v).is_empty());
        assert_eq!(backend.as_recorder().unwrap().strokes().count(), STREAK_COUNT);
        assert!(backend.as_recorder().unwrap().strokes().all(|k| k.from.y == k.to.y));
    }
}
