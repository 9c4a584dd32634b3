use crate::error::IntroError;
use crate::ui::color::{self, Rgb};
use configparser::ini::Ini;
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Viewport used until the host reports a real size
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

pub const DEFAULT_CONFIG_PATH: &str = "intro.ini";

/// Everything the intro engine is parameterised by. Immutable for the engine's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntroConfig {
    pub particle_count: usize,
    pub palette: Vec<Rgb>,
    pub initial_speed: f32,
    pub initial_acceleration: f32,
    pub acceleration_growth: f32,
    pub exit_speed: f32,
    pub pre_acceleration_delay_ms: u64,
    pub transition_duration_ms: u64,
    pub text_offsets_ms: Vec<u64>,
    pub road_visible_speed: f32,
    pub road_mark_count: usize,
    pub road_damping: f32,
    /// Fixed seed for particle and road randomisation; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            particle_count: 600,
            palette: color::DEFAULT_PALETTE.to_vec(),
            initial_speed: 1.5,
            initial_acceleration: 0.03,
            acceleration_growth: 0.005,
            exit_speed: 45.0,
            pre_acceleration_delay_ms: 2800,
            transition_duration_ms: 800,
            text_offsets_ms: vec![500, 1200, 2000],
            road_visible_speed: 5.0,
            road_mark_count: 15,
            road_damping: 0.7,
            seed: None,
        }
    }
}

impl IntroConfig {
    #[inline(always)]
    pub fn pre_acceleration_delay(&self) -> Duration {
        Duration::from_millis(self.pre_acceleration_delay_ms)
    }

    #[inline(always)]
    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_duration_ms)
    }

    pub fn validate(&self) -> Result<(), IntroError> {
        let bad = |msg: String| Err(IntroError::Configuration(msg));

        if self.particle_count == 0 {
            return bad("particle count must be at least 1".to_string());
        }
        if self.palette.is_empty() {
            return bad("palette must contain at least one colour".to_string());
        }
        for (name, v) in [
            ("initial speed", self.initial_speed),
            ("initial acceleration", self.initial_acceleration),
            ("exit speed", self.exit_speed),
            ("road visibility speed", self.road_visible_speed),
        ] {
            if !v.is_finite() || v < 0.0 {
                return bad(format!("{} must be a finite, non-negative number (got {})", name, v));
            }
        }
        if !self.acceleration_growth.is_finite() || self.acceleration_growth <= 0.0 {
            return bad(format!(
                "acceleration growth must be positive (got {})",
                self.acceleration_growth
            ));
        }
        if self.exit_speed <= 0.0 {
            return bad("exit speed must be positive".to_string());
        }
        if self.road_mark_count == 0 {
            return bad("road mark count must be at least 1".to_string());
        }
        if !(self.road_damping > 0.0 && self.road_damping < 1.0) {
            return bad(format!("road damping must lie in (0, 1) (got {})", self.road_damping));
        }
        Ok(())
    }
}

/// Settings that only the headless host uses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Simulated tap on the overlay at this elapsed time.
    pub skip_at_ms: Option<u64>,
    /// Hard stop for the simulation in case the sequence never finishes.
    pub max_duration_ms: u64,
    pub output_dir: PathBuf,
    /// Dump every Nth frame as PNG; 0 disables frame dumps.
    pub frame_stride: u32,
    pub audio_track: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub intro_lines: Vec<String>,
    pub reveal_sections: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: 60,
            skip_at_ms: None,
            max_duration_ms: 20_000,
            output_dir: PathBuf::from("frames"),
            frame_stride: 10,
            audio_track: None,
            report_path: Some(PathBuf::from("frames/report.json")),
            intro_lines: vec![
                "Get ready...".to_string(),
                "Start your engines".to_string(),
                "You're invited!".to_string(),
            ],
            reveal_sections: vec![
                "countdown".to_string(),
                "details".to_string(),
                "gallery".to_string(),
                "rsvp".to_string(),
            ],
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), IntroError> {
        if self.width == 0 || self.height == 0 {
            return Err(IntroError::Configuration(format!(
                "viewport must be non-empty (got {}x{})",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(IntroError::Configuration("fps must be at least 1".to_string()));
        }
        Ok(())
    }

    #[inline(always)]
    pub fn frame_step(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    pub intro: IntroConfig,
    pub run: RunConfig,
}

impl Settings {
    /// Loads `path`, writing a file with the defaults first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, IntroError> {
        if !path.exists() {
            info!("Config '{}' not found, writing defaults.", path.display());
            let defaults = Self::default();
            defaults.write(path)?;
            return Ok(defaults);
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, IntroError> {
        let mut conf = Ini::new();
        conf.load(path)
            .map_err(|e| IntroError::Configuration(format!("failed to read '{}': {}", path.display(), e)))?;
        let settings = Self::from_ini(&conf)?;
        info!("Loaded config from '{}'.", path.display());
        Ok(settings)
    }

    pub fn from_ini(conf: &Ini) -> Result<Self, IntroError> {
        let d = Self::default();
        let r = Reader { conf };

        let intro = IntroConfig {
            particle_count: r.uint("particles", "count", d.intro.particle_count as u64)? as usize,
            palette: match conf.get("particles", "palette") {
                Some(list) => color::palette_from_list(&list).map_err(IntroError::Configuration)?,
                None => {
                    warn!("[particles] palette missing, using default palette.");
                    d.intro.palette.clone()
                }
            },
            initial_speed: r.float("speed", "initial", d.intro.initial_speed)?,
            initial_acceleration: r.float("speed", "acceleration", d.intro.initial_acceleration)?,
            acceleration_growth: r.float("speed", "growth", d.intro.acceleration_growth)?,
            exit_speed: r.float("speed", "exit", d.intro.exit_speed)?,
            pre_acceleration_delay_ms: r.uint("timing", "pre_acceleration_ms", d.intro.pre_acceleration_delay_ms)?,
            transition_duration_ms: r.uint("timing", "transition_ms", d.intro.transition_duration_ms)?,
            text_offsets_ms: match conf.get("timing", "text_offsets_ms") {
                Some(list) => parse_u64_list(&list)?,
                None => d.intro.text_offsets_ms.clone(),
            },
            road_visible_speed: r.float("road", "visible_speed", d.intro.road_visible_speed)?,
            road_mark_count: r.uint("road", "marks", d.intro.road_mark_count as u64)? as usize,
            road_damping: r.float("road", "damping", d.intro.road_damping)?,
            seed: r.opt_uint("particles", "seed")?,
        };

        let run = RunConfig {
            width: r.uint32("viewport", "width", d.run.width)?,
            height: r.uint32("viewport", "height", d.run.height)?,
            fps: r.uint32("run", "fps", d.run.fps)?,
            skip_at_ms: r.opt_uint("run", "skip_at_ms")?,
            max_duration_ms: r.uint("run", "max_duration_ms", d.run.max_duration_ms)?,
            output_dir: conf.get("run", "output_dir").map(PathBuf::from).unwrap_or(d.run.output_dir),
            frame_stride: r.uint32("run", "frame_stride", d.run.frame_stride)?,
            audio_track: conf.get("run", "audio_track").filter(|s| !s.is_empty()).map(PathBuf::from),
            report_path: match conf.get("run", "report") {
                Some(s) if s.is_empty() => None,
                Some(s) => Some(PathBuf::from(s)),
                None => d.run.report_path,
            },
            intro_lines: conf.get("run", "intro_lines").map(|s| split_list(&s, '|')).unwrap_or(d.run.intro_lines),
            reveal_sections: conf.get("run", "reveal_sections").map(|s| split_list(&s, ',')).unwrap_or(d.run.reveal_sections),
        };

        intro.validate()?;
        run.validate()?;
        Ok(Self { intro, run })
    }

    pub fn write(&self, path: &Path) -> Result<(), IntroError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut conf = Ini::new();
        let i = &self.intro;
        let palette: Vec<String> = i.palette.iter().map(|c| color::to_hex(*c)).collect();
        conf.set("particles", "count", Some(i.particle_count.to_string()));
        conf.set("particles", "palette", Some(palette.join(", ")));
        if let Some(seed) = i.seed {
            conf.set("particles", "seed", Some(seed.to_string()));
        }
        conf.set("speed", "initial", Some(i.initial_speed.to_string()));
        conf.set("speed", "acceleration", Some(i.initial_acceleration.to_string()));
        conf.set("speed", "growth", Some(i.acceleration_growth.to_string()));
        conf.set("speed", "exit", Some(i.exit_speed.to_string()));
        conf.set("timing", "pre_acceleration_ms", Some(i.pre_acceleration_delay_ms.to_string()));
        conf.set("timing", "transition_ms", Some(i.transition_duration_ms.to_string()));
        let offsets: Vec<String> = i.text_offsets_ms.iter().map(u64::to_string).collect();
        conf.set("timing", "text_offsets_ms", Some(offsets.join(", ")));
        conf.set("road", "visible_speed", Some(i.road_visible_speed.to_string()));
        conf.set("road", "marks", Some(i.road_mark_count.to_string()));
        conf.set("road", "damping", Some(i.road_damping.to_string()));

        let r = &self.run;
        conf.set("viewport", "width", Some(r.width.to_string()));
        conf.set("viewport", "height", Some(r.height.to_string()));
        conf.set("run", "fps", Some(r.fps.to_string()));
        if let Some(ms) = r.skip_at_ms {
            conf.set("run", "skip_at_ms", Some(ms.to_string()));
        }
        conf.set("run", "max_duration_ms", Some(r.max_duration_ms.to_string()));
        conf.set("run", "output_dir", Some(r.output_dir.display().to_string()));
        conf.set("run", "frame_stride", Some(r.frame_stride.to_string()));
        if let Some(track) = &r.audio_track {
            conf.set("run", "audio_track", Some(track.display().to_string()));
        }
        let report = r.report_path.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
        conf.set("run", "report", Some(report));
        conf.set("run", "intro_lines", Some(r.intro_lines.join(" | ")));
        conf.set("run", "reveal_sections", Some(r.reveal_sections.join(", ")));

        conf.write(path)?;
        Ok(())
    }
}

struct Reader<'a> {
    conf: &'a Ini,
}

impl Reader<'_> {
    fn uint(&self, section: &str, key: &str, default: u64) -> Result<u64, IntroError> {
        Ok(self.opt_uint(section, key)?.unwrap_or_else(|| {
            warn!("[{}] {} missing, using default {}.", section, key, default);
            default
        }))
    }

    fn uint32(&self, section: &str, key: &str, default: u32) -> Result<u32, IntroError> {
        let v = self.uint(section, key, default as u64)?;
        u32::try_from(v)
            .map_err(|_| IntroError::Configuration(format!("[{}] {}: {} is out of range", section, key, v)))
    }

    fn opt_uint(&self, section: &str, key: &str) -> Result<Option<u64>, IntroError> {
        self.conf
            .getuint(section, key)
            .map_err(|e| IntroError::Configuration(format!("[{}] {}: {}", section, key, e)))
    }

    fn float(&self, section: &str, key: &str, default: f32) -> Result<f32, IntroError> {
        let v = self
            .conf
            .getfloat(section, key)
            .map_err(|e| IntroError::Configuration(format!("[{}] {}: {}", section, key, e)))?;
        Ok(v.map(|v| v as f32).unwrap_or_else(|| {
            warn!("[{}] {} missing, using default {}.", section, key, default);
            default
        }))
    }
}

fn parse_u64_list(s: &str) -> Result<Vec<u64>, IntroError> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map_err(|e| IntroError::Configuration(format!("'{}' is not a millisecond offset: {}", part, e)))
        })
        .collect()
}

fn split_list(s: &str, sep: char) -> Vec<String> {
    s.split(sep).map(str::trim).filter(|p| !p.is_empty()).map(str::to_string).collect()
}
