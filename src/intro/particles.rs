// src/intro/particles.rs
//! Perspective speed particles.
//!
//! Particles live in a virtual plane centred on the viewport, spread to 1.5x
//! its size, and fly toward the viewer along depth `z`. Each frame a particle
//! is drawn as a streak from its previous projected position to its current
//! one, so streaks lengthen as speed grows. Particles that cross the near
//! plane are recycled in place; the pool never grows or shrinks.
use crate::core::gfx::{Backend, Point, Stroke};
use crate::core::space::Viewport;
use crate::error::RenderWarning;
use crate::ui::color::{self, Rgb};
use rand::rngs::StdRng;
use rand::Rng;

// ---- placement ----
const SPREAD: f32 = 1.5;
const NEAR_PLANE: f32 = 1.0;

// ---- look ----
const CULL_MARGIN: f32 = 50.0;
const ALPHA_SCALE: f32 = 0.8;
const WIDTH_SCALE: f32 = 0.12;
const MAX_WIDTH: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    /// Depth in (0, width at last reset].
    pub z: f32,
    /// Depth on the previous frame; the far end of the streak.
    pub pz: f32,
    pub color: Rgb,
}

/// Fresh position, depth and colour. `pz == z`, so a new particle draws as a point.
pub fn spawn(rng: &mut StdRng, viewport: &Viewport, palette: &[Rgb]) -> Particle {
    let x = (rng.random::<f32>() - 0.5) * viewport.width() * SPREAD;
    let y = (rng.random::<f32>() - 0.5) * viewport.height() * SPREAD;
    // 1 - [0, 1) keeps depth strictly positive
    let z = viewport.width() * (1.0 - rng.random::<f32>());
    let color = palette[rng.random_range(0..palette.len())];
    Particle { x, y, z, pz: z, color }
}

/// Moves one particle toward the viewer. Returns `true` if it crossed the near plane.
#[inline(always)]
pub fn advance(p: &mut Particle, speed: f32) -> bool {
    p.pz = p.z;
    p.z -= speed;
    p.z < NEAR_PLANE
}

#[inline(always)]
fn to_screen(x: f32, y: f32, z: f32, viewport: &Viewport) -> Point {
    Point::new(
        (x / z) * viewport.center_x() + viewport.center_x(),
        (y / z) * viewport.center_y() + viewport.center_y(),
    )
}

/// Perspective-projects a particle to its motion streak.
///
/// `Ok(None)` means culled (current point outside the viewport plus margin),
/// `Err(())` means the projection produced a non-finite point.
pub fn project(p: &Particle, viewport: &Viewport) -> Result<Option<Stroke>, ()> {
    let head = to_screen(p.x, p.y, p.z, viewport);
    let tail = to_screen(p.x, p.y, p.pz, viewport);
    if ![head.x, head.y, tail.x, tail.y].iter().all(|v| v.is_finite()) {
        return Err(());
    }
    if !viewport.contains_with_margin(head.x, head.y, CULL_MARGIN) {
        return Ok(None);
    }

    let w = viewport.width();
    let nearness = (1.0 - p.z / w).clamp(0.0, 1.0);
    let width = ((w / p.z) * WIDTH_SCALE).min(MAX_WIDTH);

    Ok(Some(Stroke {
        from: tail,
        to: head,
        width,
        color: color::rgba(p.color, nearness * ALPHA_SCALE),
    }))
}

pub struct ParticleField {
    particles: Vec<Particle>,
    palette: Vec<Rgb>,
    rng: StdRng,
    recycled: u64,
}

impl ParticleField {
    /// Fills the pool with `count` particles spread over the current viewport.
    pub fn initialize(count: usize, palette: Vec<Rgb>, viewport: &Viewport, mut rng: StdRng) -> Self {
        let particles = (0..count).map(|_| spawn(&mut rng, viewport, &palette)).collect();
        Self { particles, palette, rng, recycled: 0 }
    }

    #[inline(always)] pub fn len(&self) -> usize { self.particles.len() }
    #[inline(always)] pub fn is_empty(&self) -> bool { self.particles.is_empty() }
    #[inline(always)] pub fn particles(&self) -> &[Particle] { &self.particles }

    /// Total near-plane crossings since initialisation.
    #[inline(always)] pub fn recycled(&self) -> u64 { self.recycled }

    /// Advances every particle by `speed`, recycling the ones that reached the
    /// near plane with the *current* viewport size.
    pub fn advance(&mut self, speed: f32, viewport: &Viewport) {
        for p in self.particles.iter_mut() {
            if advance(p, speed) {
                *p = spawn(&mut self.rng, viewport, &self.palette);
                self.recycled += 1;
            }
        }
    }

    /// Strokes every visible particle. Failures are collected, never fatal.
    pub fn draw(&self, backend: &mut Backend, viewport: &Viewport) -> Vec<RenderWarning> {
        let mut warnings = Vec::new();
        for (index, p) in self.particles.iter().enumerate() {
            match project(p, viewport) {
                Ok(Some(stroke)) => {
                    if let Err(reason) = backend.stroke_line(&stroke) {
                        warnings.push(RenderWarning::Surface { element: "particle", index, reason });
                    }
                }
                Ok(None) => {}
                Err(()) => warnings.push(RenderWarning::NonFiniteProjection { element: "particle", index }),
            }
        }
        warnings
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gfx::Recorder;
    use rand::SeedableRng;

    fn viewport() -> Viewport {
        Viewport::new(1280, 720).unwrap()
    }

    fn field(count: usize) -> ParticleField {
        ParticleField::initialize(count, color::DEFAULT_PALETTE.to_vec(), &viewport(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn spawn_stays_inside_spread_and_depth_range() {
        let v = viewport();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..2000 {
            let p = spawn(&mut rng, &v, &color::DEFAULT_PALETTE);
            assert!(p.x.abs() <= 0.5 * SPREAD * v.width());
            assert!(p.y.abs() <= 0.5 * SPREAD * v.height());
            assert!(p.z > 0.0 && p.z <= v.width());
            assert_eq!(p.z, p.pz);
            assert!(color::DEFAULT_PALETTE.contains(&p.color));
        }
    }

    #[test]
    fn depth_invariant_holds_at_every_speed() {
        let v = viewport();
        let mut f = field(300);
        for frame in 0..600 {
            let speed = 1.5 + frame as f32 * 0.2;
            f.advance(speed, &v);
            assert_eq!(f.len(), 300);
            for p in f.particles() {
                assert!(p.z > 0.0 && p.z <= v.width(), "z = {} at frame {}", p.z, frame);
            }
        }
        assert!(f.recycled() > 0);
    }

    #[test]
    fn crossing_the_near_plane_recycles() {
        let mut p = Particle { x: 10.0, y: 10.0, z: 2.0, pz: 2.0, color: [255, 255, 255] };
        assert!(!advance(&mut p, 0.5));
        assert_eq!((p.pz, p.z), (2.0, 1.5));
        assert!(advance(&mut p, 1.0));
    }

    #[test]
    fn streak_runs_from_previous_to_current_depth() {
        let v = viewport();
        let p = Particle { x: 100.0, y: 50.0, z: 200.0, pz: 400.0, color: [0, 212, 255] };
        let s = project(&p, &v).unwrap().unwrap();
        assert_eq!(s.to, Point::new(100.0 / 200.0 * 640.0 + 640.0, 50.0 / 200.0 * 360.0 + 360.0));
        assert_eq!(s.from, Point::new(100.0 / 400.0 * 640.0 + 640.0, 50.0 / 400.0 * 360.0 + 360.0));
        // near particles are bright and thick, far ones faint and thin
        let far = Particle { z: 1200.0, pz: 1200.0, ..p };
        let far_s = project(&far, &v).unwrap().unwrap();
        assert!(s.color[3] > far_s.color[3]);
        assert!(s.width > far_s.width);
    }

    #[test]
    fn width_is_clamped_near_the_viewer() {
        let p = Particle { x: 0.0, y: 0.0, z: 1.0, pz: 2.0, color: [255, 0, 0] };
        let s = project(&p, &viewport()).unwrap().unwrap();
        assert_eq!(s.width, MAX_WIDTH);
    }

    #[test]
    fn off_screen_heads_are_culled() {
        let p = Particle { x: 900.0, y: 0.0, z: 100.0, pz: 120.0, color: [255, 0, 0] };
        assert_eq!(project(&p, &viewport()), Ok(None));
    }

    #[test]
    fn bad_particle_is_skipped_and_the_rest_still_draw() {
        let v = viewport();
        let mut f = field(20);
        f.particles_mut()[3].x = f32::NAN;
        let mut backend = Backend::Recorder(Recorder::new(1280, 720));
        let warnings = f.draw(&mut backend, &v);
        assert_eq!(warnings, vec![RenderWarning::NonFiniteProjection { element: "particle", index: 3 }]);
        let drawn = backend.as_recorder().unwrap().strokes().count();
        let visible = f
            .particles()
            .iter()
            .filter(|p| matches!(project(p, &v), Ok(Some(_))))
            .count();
        assert_eq!(drawn, visible);
    }
}
