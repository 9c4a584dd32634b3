// src/intro/mod.rs
//! The intro sequence: a perspective speed-line field that accelerates until
//! it hits exit velocity, then hands over to the page.
//!
//! `IntroEngine` owns every piece of mutable state and is driven by the host
//! through `start`, `tick(dt)`, `handle_pointer` and `resize`. The host also
//! supplies the frame scheduler and the collaborators invoked at the end.
pub mod particles;
pub mod phase;
pub mod road;
pub mod speed;
pub mod streaks;
pub mod text;

use crate::config::IntroConfig;
use crate::core::gfx::{self, stop, Backend, Point, RadialGradient, Rect};
use crate::core::input::{self, PointerEvent, PointerState};
use crate::core::space::Viewport;
use crate::error::{IntroError, RenderWarning};
use crate::intro::particles::ParticleField;
use crate::intro::phase::{Phase, PhaseChange, PhaseMachine, Transition};
use crate::intro::road::RoadOverlay;
use crate::intro::speed::SpeedController;
use crate::intro::streaks::{SpeedStreaks, STREAK_COUNT};
use crate::intro::text::TextSequencer;
use crate::ui::color;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/* ------------------------- per-frame look ------------------------- */
const FADE_ALPHA: f32 = 0.85;
const VIGNETTE_INNER: f32 = 0.2;
const VIGNETTE_OUTER: f32 = 0.8;
const VIGNETTE_ALPHA: f32 = 0.4;

// Road marks and speed lines draw from their own streams so particle layouts
// don't depend on their counts.
const ROAD_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;
const STREAK_SEED_SALT: u64 = 0xc2b2_ae3d_27d4_eb4f;

/* -------------------------- host contract -------------------------- */

/// Opaque handle for one scheduled frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Display-paced frame scheduling, provided by the host.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackRejected(pub String);

impl fmt::Display for PlaybackRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback rejected: {}", self.0)
    }
}

/// Page-side systems the intro calls into but does not own.
pub trait Collaborators {
    /// Text line `line` of the intro becomes visible.
    fn reveal_text(&mut self, line: usize);

    /// The overlay starts its exit animation.
    fn transition_started(&mut self) {}

    /// Hide the overlay and let the page scroll again.
    fn unlock_content(&mut self);

    /// Start background music. Platforms may refuse; that is not an error.
    fn resume_playback(&mut self) -> Result<(), PlaybackRejected>;

    /// Start revealing page sections as they scroll into view.
    fn enable_reveal(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    NotAttempted,
    Playing,
    NotPlaying,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Another frame was scheduled.
    Continue,
    /// The sequence is done; the render loop has ended.
    Stopped,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntroStats {
    pub frames_rendered: u64,
    pub render_warnings: u64,
    pub particles_recycled: u64,
    pub ticks_to_exit: Option<u32>,
    pub final_speed: f32,
    pub playback: PlaybackState,
    pub phases: Vec<PhaseChange>,
}

/* ------------------------------ engine ------------------------------ */

pub struct IntroEngine {
    viewport: Viewport,
    backend: Backend,
    particles: ParticleField,
    road: RoadOverlay,
    streaks: SpeedStreaks,
    speed: SpeedController,
    phase: PhaseMachine,
    text: TextSequencer,
    pointer: PointerState,
    elapsed: Duration,
    /// The frame callback currently scheduled and not yet delivered.
    frame: Option<FrameHandle>,
    started: bool,
    loop_stopped: bool,
    frames_rendered: u64,
    render_warnings: u64,
    ticks_to_exit: Option<u32>,
    playback: PlaybackState,
}

impl IntroEngine {
    /// Builds the engine. Fails if the configuration is invalid or the surface
    /// is missing or lacks one of the required primitives.
    pub fn new(config: &IntroConfig, viewport: Viewport, backend: Option<Backend>) -> Result<Self, IntroError> {
        config.validate()?;
        let backend = gfx::verify(backend)?;

        let rng = |salt: u64| match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ salt),
            None => StdRng::from_os_rng(),
        };
        let particle_rng = rng(0);
        let mut road_rng = rng(ROAD_SEED_SALT);

        let particles = ParticleField::initialize(config.particle_count, config.palette.clone(), &viewport, particle_rng);
        let road = RoadOverlay::new(
            config.road_mark_count,
            config.road_damping,
            config.road_visible_speed,
            &viewport,
            &mut road_rng,
        );
        let streaks = SpeedStreaks::new(STREAK_COUNT, &mut rng(STREAK_SEED_SALT));

        info!(
            "Intro engine ready: {} particles, {} road marks, {}x{} viewport",
            particles.len(),
            road.marks().len(),
            viewport.width(),
            viewport.height()
        );

        Ok(Self {
            viewport,
            backend,
            particles,
            road,
            streaks,
            speed: SpeedController::new(config),
            phase: PhaseMachine::new(config),
            text: TextSequencer::new(&config.text_offsets_ms),
            pointer: input::init_state(),
            elapsed: Duration::ZERO,
            frame: None,
            started: false,
            loop_stopped: false,
            frames_rendered: 0,
            render_warnings: 0,
            ticks_to_exit: None,
            playback: PlaybackState::NotAttempted,
        })
    }

    /* --------------------------- accessors --------------------------- */

    #[inline(always)] pub fn phase(&self) -> Phase { self.phase.phase() }
    #[inline(always)] pub fn speed(&self) -> f32 { self.speed.speed() }
    #[inline(always)] pub fn elapsed(&self) -> Duration { self.elapsed }
    #[inline(always)] pub fn viewport(&self) -> &Viewport { &self.viewport }
    #[inline(always)] pub fn backend(&self) -> &Backend { &self.backend }
    #[inline(always)] pub fn backend_mut(&mut self) -> &mut Backend { &mut self.backend }
    #[inline(always)] pub fn particles(&self) -> &ParticleField { &self.particles }
    #[inline(always)] pub fn road(&self) -> &RoadOverlay { &self.road }
    #[inline(always)] pub fn playback(&self) -> PlaybackState { self.playback }
    #[inline(always)] pub fn frames_rendered(&self) -> u64 { self.frames_rendered }

    /// True while the render loop still wants frames.
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.started && !self.loop_stopped
    }

    /// Timer work still outstanding: text reveals, or a time-driven phase
    /// change. Both outlive the render loop.
    #[inline(always)]
    pub fn timers_pending(&self) -> bool {
        !self.text.is_finished() || matches!(self.phase(), Phase::Waiting | Phase::Transitioning)
    }

    pub fn stats(&self) -> IntroStats {
        IntroStats {
            frames_rendered: self.frames_rendered,
            render_warnings: self.render_warnings,
            particles_recycled: self.particles.recycled(),
            ticks_to_exit: self.ticks_to_exit,
            final_speed: self.speed.speed(),
            playback: self.playback,
            phases: self.phase.history().to_vec(),
        }
    }

    /* ---------------------------- lifecycle ---------------------------- */

    /// Arms the text schedule and requests the first frame. Idempotent.
    pub fn start<S: FrameScheduler>(&mut self, scheduler: &mut S) {
        if self.started {
            return;
        }
        self.started = true;
        self.frame = Some(scheduler.request_frame());
        info!("Intro started; {} text reveals scheduled", self.text.pending());
    }

    /// Timer callback: advances the wall clock, fires due text reveals and
    /// applies the time-driven phase changes. Works with or without the
    /// render loop, so a skipped intro still finishes and reveals its text.
    pub fn advance_timers<H: FrameScheduler + Collaborators>(&mut self, dt: Duration, host: &mut H) {
        if !self.started {
            return;
        }
        self.elapsed += dt;
        for line in self.text.due(self.elapsed) {
            host.reveal_text(line);
        }
        if let Some(t) = self.phase.evaluate_timers(self.elapsed) {
            self.on_transition(t, host);
        }
    }

    /// One frame callback.
    pub fn tick<H: FrameScheduler + Collaborators>(&mut self, dt: Duration, host: &mut H) -> FrameOutcome {
        if !self.is_running() {
            debug!("Frame callback while the loop is not running; ignored");
            return FrameOutcome::Stopped;
        }
        // this callback has been delivered; book the continuation, which is
        // cancelled if the frame ends the loop
        self.frame = Some(host.request_frame());

        self.advance_timers(dt, host);
        if !self.is_running() {
            return FrameOutcome::Stopped;
        }

        let mut warnings: Vec<RenderWarning> = Vec::new();

        // 1) fade the previous frame, leaving motion trails
        let (w, h) = (self.viewport.width(), self.viewport.height());
        let full = Rect::new(0.0, 0.0, w, h);
        if self.frames_rendered == 0 {
            if let Err(reason) = self.backend.clear(color::BLACK) {
                warnings.push(RenderWarning::Surface { element: "clear", index: 0, reason });
            }
        }
        if let Err(reason) = self.backend.fill_rect(full, color::rgba8(0, 0, 0, FADE_ALPHA)) {
            warnings.push(RenderWarning::Surface { element: "fade", index: 0, reason });
        }

        // 2) vignette
        let vignette = RadialGradient {
            center: Point::new(self.viewport.center_x(), self.viewport.center_y()),
            inner_radius: w * VIGNETTE_INNER,
            outer_radius: w * VIGNETTE_OUTER,
            stops: vec![
                stop(0.0, color::TRANSPARENT),
                stop(1.0, color::rgba8(0, 0, 0, VIGNETTE_ALPHA)),
            ],
        };
        if let Err(reason) = self.backend.fill_radial_gradient(full, &vignette) {
            warnings.push(RenderWarning::Surface { element: "vignette", index: 0, reason });
        }

        // 3) road, once fast enough
        let speed = self.speed.speed();
        if self.road.is_visible(speed) {
            self.road.advance(speed, &self.viewport);
            warnings.extend(self.road.render(&mut self.backend, &self.viewport));
        }

        // 4) accelerate
        if self.phase() == Phase::Accelerating {
            self.speed.tick();
        }

        // 5) particles, then the speed lines over them once moving
        self.particles.advance(self.speed.speed(), &self.viewport);
        warnings.extend(self.particles.draw(&mut self.backend, &self.viewport));
        if let Some(since) = self.moving_since() {
            warnings.extend(self.streaks.draw(self.elapsed.saturating_sub(since), &mut self.backend, &self.viewport));
        }

        for warning in &warnings {
            warn!("{}", warning);
        }
        self.render_warnings += warnings.len() as u64;
        self.frames_rendered += 1;

        // 6) phase
        if let Some(t) = self.phase.evaluate(self.elapsed, &mut self.speed, false) {
            self.on_transition(t, host);
        }

        // 7) keep the booked continuation, or stop
        if self.is_running() {
            FrameOutcome::Continue
        } else {
            FrameOutcome::Stopped
        }
    }

    /// User skip. Collapses waiting/accelerating into transitioning; otherwise nothing.
    pub fn skip<H: FrameScheduler + Collaborators>(&mut self, host: &mut H) -> bool {
        match self.phase.evaluate(self.elapsed, &mut self.speed, true) {
            Some(t) => {
                info!("Intro skipped at {} ms", self.elapsed.as_millis());
                self.on_transition(t, host);
                true
            }
            None => {
                debug!("Skip ignored in phase {:?}", self.phase());
                false
            }
        }
    }

    /// Feeds a pointer event; a completed tap is the skip gesture.
    pub fn handle_pointer<H: FrameScheduler + Collaborators>(&mut self, event: PointerEvent, host: &mut H) -> bool {
        if input::handle_pointer(event, &mut self.pointer) {
            return self.skip(host);
        }
        false
    }

    /// Recaches the viewport between frames. Live particles keep their
    /// positions and depths; only future recycles use the new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.viewport.resize(width, height) {
            self.backend.resize(width, height);
        }
    }

    /// When the car started moving: entry to accelerating, or to transitioning on a skip.
    fn moving_since(&self) -> Option<Duration> {
        self.phase
            .history()
            .iter()
            .find(|c| matches!(c.phase, Phase::Accelerating | Phase::Transitioning))
            .map(|c| c.at)
    }

    /// Ends the render loop, cancelling the scheduled continuation. Idempotent.
    fn stop_loop<S: FrameScheduler>(&mut self, scheduler: &mut S) {
        if self.loop_stopped {
            return;
        }
        self.loop_stopped = true;
        if let Some(handle) = self.frame.take() {
            scheduler.cancel_frame(handle);
        }
        debug!("Render loop stopped after {} frames", self.frames_rendered);
    }

    fn on_transition<H: FrameScheduler + Collaborators>(&mut self, transition: Transition, host: &mut H) {
        match transition {
            Transition::BeginAcceleration => {}
            Transition::BeginTransition { skipped } => {
                self.ticks_to_exit = Some(self.speed.ticks());
                debug!(
                    "Exit at speed {:.2} after {} accelerating ticks (skipped: {})",
                    self.speed.speed(),
                    self.speed.ticks(),
                    skipped
                );
                host.transition_started();
                // reaching exit velocity ends the canvas animation; a skip
                // keeps it running through the transition
                if !skipped {
                    self.stop_loop(host);
                }
            }
            Transition::Finish => {
                self.stop_loop(host);
                host.unlock_content();
                self.playback = match host.resume_playback() {
                    Ok(()) => PlaybackState::Playing,
                    Err(e) => {
                        info!("{}; waiting for the user to start music", e);
                        PlaybackState::NotPlaying
                    }
                };
                host.enable_reveal();
            }
        }
    }
}
