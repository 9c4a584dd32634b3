// src/app.rs
//! Headless host for the intro.
//!
//! Plays the role of the page: it owns the frame scheduler, the collaborators
//! the engine calls at the end of the sequence, and drives the engine on a
//! simulated display clock. Frames are rasterized into an image and dumped
//! as PNGs; a JSON report summarises the run.
use crate::config::Settings;
use crate::core::audio::MusicPlayer;
use crate::core::gfx::{Backend, Canvas};
use crate::core::input::PointerEvent;
use crate::core::space::Viewport;
use crate::error::IntroError;
use crate::intro::phase::Phase;
use crate::intro::{Collaborators, FrameHandle, FrameOutcome, FrameScheduler, IntroEngine, IntroStats, PlaybackRejected};
use crate::utils::fps::FPSCounter;
use chrono::Local;
use log::{debug, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Simulated scroll: one page section comes into view per interval once revealing is enabled.
const SCROLL_INTERVAL: Duration = Duration::from_millis(250);

/* ----------------------------- the page ----------------------------- */

/// Scheduler plus collaborators, as seen by the engine.
pub struct Page {
    next_handle: u64,
    pending: Option<FrameHandle>,
    cancelled: u32,

    lines: Vec<String>,
    revealed_lines: Vec<usize>,
    transition_started: bool,
    content_unlocked: bool,

    music_track: Option<PathBuf>,
    music: Option<MusicPlayer>,

    sections: ScrollReveal,
}

impl Page {
    pub fn new(lines: Vec<String>, sections: Vec<String>, music_track: Option<PathBuf>) -> Self {
        Self {
            next_handle: 0,
            pending: None,
            cancelled: 0,
            lines,
            revealed_lines: Vec::new(),
            transition_started: false,
            content_unlocked: false,
            music_track,
            music: None,
            sections: ScrollReveal::new(sections),
        }
    }

    /// Consumes the pending frame callback, if any.
    pub fn take_frame(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    #[inline(always)] pub fn cancelled(&self) -> u32 { self.cancelled }
    #[inline(always)] pub fn revealed_lines(&self) -> &[usize] { &self.revealed_lines }
    #[inline(always)] pub fn content_unlocked(&self) -> bool { self.content_unlocked }
    #[inline(always)] pub fn sections(&self) -> &ScrollReveal { &self.sections }
}

impl FrameScheduler for Page {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
        self.cancelled += 1;
        debug!("Cancelled frame callback {}", handle.0);
    }
}

impl Collaborators for Page {
    fn reveal_text(&mut self, line: usize) {
        match self.lines.get(line) {
            Some(text) => info!("Intro text {}: \"{}\"", line, text),
            None => warn!("Intro text {} has no configured line", line),
        }
        self.revealed_lines.push(line);
    }

    fn transition_started(&mut self) {
        self.transition_started = true;
        info!("Overlay exit animation started");
    }

    fn unlock_content(&mut self) {
        self.content_unlocked = true;
        info!("Overlay hidden, page scroll unlocked");
    }

    fn resume_playback(&mut self) -> Result<(), PlaybackRejected> {
        let Some(track) = self.music_track.as_deref() else {
            return Err(PlaybackRejected("no audio track configured".to_string()));
        };
        let player = MusicPlayer::open(track).map_err(|e| PlaybackRejected(e.to_string()))?;
        player.play().map_err(|e| PlaybackRejected(e.to_string()))?;
        self.music = Some(player);
        Ok(())
    }

    fn enable_reveal(&mut self) {
        self.sections.enable();
    }
}

/* --------------------------- scroll reveal --------------------------- */

/// Page sections that fade in the first time they scroll into view.
pub struct ScrollReveal {
    names: Vec<String>,
    revealed: Vec<bool>,
    enabled: bool,
    next: usize,
    since_last: Duration,
}

impl ScrollReveal {
    pub fn new(names: Vec<String>) -> Self {
        let revealed = vec![false; names.len()];
        Self { names, revealed, enabled: false, next: 0, since_last: Duration::ZERO }
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            info!("Scroll reveal enabled for {} sections", self.names.len());
        }
    }

    #[inline(always)] pub fn is_enabled(&self) -> bool { self.enabled }

    /// Marks section `index` revealed. Returns `false` if it already was, or
    /// revealing is not enabled yet.
    pub fn observe(&mut self, index: usize) -> bool {
        if !self.enabled {
            return false;
        }
        match self.revealed.get_mut(index) {
            Some(seen) if !*seen => {
                *seen = true;
                info!("Section '{}' revealed", self.names[index]);
                true
            }
            _ => false,
        }
    }

    /// Simulated scrolling: brings the next section into view every `SCROLL_INTERVAL`.
    pub fn scroll(&mut self, dt: Duration) {
        if !self.enabled || self.is_complete() {
            return;
        }
        self.since_last += dt;
        while self.since_last >= SCROLL_INTERVAL && self.next < self.names.len() {
            self.since_last -= SCROLL_INTERVAL;
            self.observe(self.next);
            self.next += 1;
        }
    }

    pub fn revealed(&self) -> Vec<&str> {
        self.names
            .iter()
            .zip(&self.revealed)
            .filter(|(_, seen)| **seen)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.revealed.iter().all(|seen| *seen)
    }
}

/* ------------------------------ report ------------------------------ */

#[derive(Serialize)]
struct RunReport<'a> {
    generated_at: String,
    simulated_ms: u64,
    frames_dumped: u32,
    frame_callbacks_cancelled: u32,
    overlay_exit_started: bool,
    content_unlocked: bool,
    music_playing: bool,
    text_revealed: &'a [usize],
    sections_revealed: Vec<&'a str>,
    intro: IntroStats,
    settings: &'a Settings,
}

/* ------------------------------- app ------------------------------- */

pub struct App {
    settings: Settings,
    engine: IntroEngine,
    page: Page,
    fps: FPSCounter,
    frames_dumped: u32,
}

impl App {
    pub fn new(settings: Settings) -> Result<Self, Box<dyn Error>> {
        let run = &settings.run;
        let viewport = Viewport::new(run.width, run.height)
            .ok_or_else(|| IntroError::Configuration(format!("bad viewport {}x{}", run.width, run.height)))?;
        let backend = Backend::Software(Canvas::new(run.width, run.height));
        let engine = IntroEngine::new(&settings.intro, viewport, Some(backend))?;
        let page = Page::new(run.intro_lines.clone(), run.reveal_sections.clone(), run.audio_track.clone());

        if run.frame_stride > 0 {
            fs::create_dir_all(&run.output_dir)?;
        }

        Ok(Self { settings, engine, page, fps: FPSCounter::new(), frames_dumped: 0 })
    }

    pub fn run(mut self) -> Result<IntroStats, Box<dyn Error>> {
        let step = self.settings.run.frame_step();
        let limit = Duration::from_millis(self.settings.run.max_duration_ms);
        let mut skip_at = self.settings.run.skip_at_ms.map(Duration::from_millis);
        let (cx, cy) = (self.engine.viewport().center_x(), self.engine.viewport().center_y());

        self.engine.start(&mut self.page);

        // --- render loop: one engine tick per pending frame callback ---
        while self.page.take_frame().is_some() {
            if self.engine.elapsed() >= limit {
                warn!("Intro still running after {} ms; giving up", limit.as_millis());
                break;
            }
            if skip_at.is_some_and(|at| self.engine.elapsed() >= at) {
                skip_at = None;
                self.engine.handle_pointer(PointerEvent::Pressed { x: cx, y: cy }, &mut self.page);
                self.engine.handle_pointer(PointerEvent::Released { x: cx, y: cy }, &mut self.page);
            }

            let outcome = self.engine.tick(step, &mut self.page);
            self.dump_frame()?;
            if let Some(fps) = self.fps.update(step) {
                debug!("{} fps, phase {:?}, speed {:.2}", fps, self.engine.phase(), self.engine.speed());
            }
            if outcome == FrameOutcome::Stopped {
                break;
            }
        }

        // --- page keeps living: the exit transition, late text reveals, scrolling ---
        while (self.engine.phase() != Phase::Done
            || self.engine.timers_pending()
            || (self.page.sections().is_enabled() && !self.page.sections().is_complete()))
            && self.engine.elapsed() < limit
        {
            self.engine.advance_timers(step, &mut self.page);
            self.page.sections.scroll(step);
        }

        let stats = self.engine.stats();
        info!(
            "Intro finished: {} frames, {} warnings, {} particles recycled, playback {:?}",
            stats.frames_rendered, stats.render_warnings, stats.particles_recycled, stats.playback
        );

        if let Some(path) = self.settings.run.report_path.clone() {
            self.write_report(&path, &stats)?;
        }
        Ok(stats)
    }

    fn dump_frame(&mut self) -> Result<(), IntroError> {
        let stride = self.settings.run.frame_stride as u64;
        let frame = self.engine.frames_rendered();
        if stride == 0 || frame == 0 || frame % stride != 0 {
            return Ok(());
        }
        let Some(canvas) = self.engine.backend().as_canvas() else {
            return Ok(());
        };
        let path = self.settings.run.output_dir.join(format!("frame_{:05}.png", frame));
        canvas.save_png(&path)?;
        self.frames_dumped += 1;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn write_report(&self, path: &Path, stats: &IntroStats) -> Result<(), Box<dyn Error>> {
        let report = RunReport {
            generated_at: Local::now().to_rfc3339(),
            simulated_ms: self.engine.elapsed().as_millis() as u64,
            frames_dumped: self.frames_dumped,
            frame_callbacks_cancelled: self.page.cancelled(),
            overlay_exit_started: self.page.transition_started,
            content_unlocked: self.page.content_unlocked(),
            music_playing: self.page.music.is_some(),
            text_revealed: self.page.revealed_lines(),
            sections_revealed: self.page.sections().revealed(),
            intro: stats.clone(),
            settings: &self.settings,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!("Run report written to '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IntroConfig, RunConfig};
    use crate::intro::PlaybackState;

    fn settings(dir: &Path, skip_at_ms: Option<u64>) -> Settings {
        Settings {
            intro: IntroConfig { particle_count: 40, seed: Some(3), ..IntroConfig::default() },
            run: RunConfig {
                width: 160,
                height: 90,
                skip_at_ms,
                output_dir: dir.join("frames"),
                frame_stride: 0,
                report_path: Some(dir.join("report.json")),
                ..RunConfig::default()
            },
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("speedlines-app-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn skipped_run_finishes_and_reports() {
        let dir = temp_dir("skip");
        let stats = App::new(settings(&dir, Some(100))).unwrap().run().unwrap();

        assert_eq!(stats.phases.last().map(|c| c.phase), Some(Phase::Done));
        assert!(stats.phases.iter().all(|c| c.phase != Phase::Accelerating));
        assert_eq!(stats.playback, PlaybackState::NotPlaying);

        let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(dir.join("report.json")).unwrap()).unwrap();
        assert_eq!(report["frame_callbacks_cancelled"], 1);
        assert_eq!(report["content_unlocked"], true);
        assert_eq!(report["music_playing"], false);
        assert_eq!(report["text_revealed"], serde_json::json!([0, 1, 2]));
        assert_eq!(report["sections_revealed"].as_array().unwrap().len(), 4);
        assert_eq!(report["intro"]["phases"][1]["phase"], "transitioning");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unskipped_run_reaches_exit_velocity() {
        let dir = temp_dir("full");
        let stats = App::new(settings(&dir, None)).unwrap().run().unwrap();
        let phases: Vec<Phase> = stats.phases.iter().map(|c| c.phase).collect();
        assert_eq!(phases, vec![Phase::Waiting, Phase::Accelerating, Phase::Transitioning, Phase::Done]);
        assert!(stats.ticks_to_exit.is_some());
        assert!(stats.final_speed >= 45.0);

        // the loop stops at exit velocity; timers alone finish the page
        let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(dir.join("report.json")).unwrap()).unwrap();
        assert_eq!(report["frame_callbacks_cancelled"], 1);
        assert_eq!(report["content_unlocked"], true);
        assert_eq!(report["sections_revealed"].as_array().unwrap().len(), 4);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn frames_are_dumped_on_stride() {
        let dir = temp_dir("frames");
        let mut s = settings(&dir, Some(0));
        s.run.frame_stride = 10;
        s.run.report_path = None;
        let stats = App::new(s).unwrap().run().unwrap();
        let dumped = fs::read_dir(dir.join("frames")).unwrap().count() as u64;
        assert_eq!(dumped, stats.frames_rendered / 10);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn sections_reveal_once_and_only_when_enabled() {
        let mut reveal = ScrollReveal::new(vec!["a".to_string(), "b".to_string()]);
        assert!(!reveal.observe(0));
        reveal.enable();
        assert!(reveal.observe(0));
        assert!(!reveal.observe(0));
        assert!(!reveal.observe(7));
        reveal.scroll(SCROLL_INTERVAL * 3);
        assert!(reveal.is_complete());
        assert_eq!(reveal.revealed(), vec!["a", "b"]);
    }

    #[test]
    fn cancelling_clears_the_pending_callback() {
        let mut page = Page::new(Vec::new(), Vec::new(), None);
        let handle = page.request_frame();
        page.cancel_frame(handle);
        assert_eq!(page.take_frame(), None);
        assert_eq!(page.cancelled(), 1);
        assert!(page.resume_playback().is_err());
    }
}
