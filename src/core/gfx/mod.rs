mod backends;

pub use crate::core::gfx::backends::recorder::{DrawCommand, Recorder};
pub use crate::core::gfx::backends::software::Canvas;
use crate::error::IntroError;
use crate::ui::color::Rgba;
use cgmath::Point2;

// --- Public Data Contract ---
pub type Point = Point2<f32>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[inline(always)]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline(always)]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

#[inline(always)]
pub const fn stop(offset: f32, color: Rgba) -> GradientStop {
    GradientStop { offset, color }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<GradientStop>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RadialGradient {
    pub center: Point,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub stops: Vec<GradientStop>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub from: Point,
    pub to: Point,
    pub width: f32,
    pub color: Rgba,
}

/// The five primitives the intro draws with. A surface must offer all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub clear: bool,
    pub fill_rect: bool,
    pub linear_gradient: bool,
    pub radial_gradient: bool,
    pub stroke_line: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        clear: true,
        fill_rect: true,
        linear_gradient: true,
        radial_gradient: true,
        stroke_line: true,
    };

    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.clear, "clear"),
            (self.fill_rect, "fill_rect"),
            (self.linear_gradient, "linear_gradient"),
            (self.radial_gradient, "radial_gradient"),
            (self.stroke_line, "stroke_line"),
        ]
        .into_iter()
        .filter(|(has, _)| !has)
        .map(|(_, name)| name)
        .collect()
    }
}

// --- Public API Facade ---

// Backend is an enum, not a trait object. Every surface call is dispatched
// through a single `match` here.
pub enum Backend {
    Software(Canvas),
    Recorder(Recorder),
}

impl Backend {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Backend::Software(_) => Capabilities::ALL,
            Backend::Recorder(r) => r.capabilities(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            Backend::Software(c) => c.size(),
            Backend::Recorder(r) => r.size(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        match self {
            Backend::Software(c) => c.resize(width, height),
            Backend::Recorder(r) => r.resize(width, height),
        }
    }

    pub fn clear(&mut self, color: Rgba) -> Result<(), String> {
        match self {
            Backend::Software(c) => c.clear(color),
            Backend::Recorder(r) => r.clear(color),
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) -> Result<(), String> {
        match self {
            Backend::Software(c) => c.fill_rect(rect, color),
            Backend::Recorder(r) => r.fill_rect(rect, color),
        }
    }

    pub fn fill_linear_gradient(&mut self, rect: Rect, gradient: &LinearGradient) -> Result<(), String> {
        match self {
            Backend::Software(c) => c.fill_linear_gradient(rect, gradient),
            Backend::Recorder(r) => r.fill_linear_gradient(rect, gradient),
        }
    }

    pub fn fill_radial_gradient(&mut self, rect: Rect, gradient: &RadialGradient) -> Result<(), String> {
        match self {
            Backend::Software(c) => c.fill_radial_gradient(rect, gradient),
            Backend::Recorder(r) => r.fill_radial_gradient(rect, gradient),
        }
    }

    pub fn stroke_line(&mut self, stroke: &Stroke) -> Result<(), String> {
        match self {
            Backend::Software(c) => c.stroke_line(stroke),
            Backend::Recorder(r) => r.stroke_line(stroke),
        }
    }

    pub fn as_canvas(&self) -> Option<&Canvas> {
        match self {
            Backend::Software(c) => Some(c),
            Backend::Recorder(_) => None,
        }
    }

    pub fn as_recorder(&self) -> Option<&Recorder> {
        match self {
            Backend::Recorder(r) => Some(r),
            Backend::Software(_) => None,
        }
    }

    pub fn as_recorder_mut(&mut self) -> Option<&mut Recorder> {
        match self {
            Backend::Recorder(r) => Some(r),
            Backend::Software(_) => None,
        }
    }
}

/// Accepts a surface only if it exists and supports every primitive.
pub fn verify(backend: Option<Backend>) -> Result<Backend, IntroError> {
    let backend = backend
        .ok_or_else(|| IntroError::Configuration("no drawing surface supplied".to_string()))?;
    let missing = backend.capabilities().missing();
    if !missing.is_empty() {
        return Err(IntroError::Configuration(format!(
            "drawing surface lacks required primitives: {}",
            missing.join(", ")
        )));
    }
    Ok(backend)
}

/// Colour at `t` along sorted gradient stops, clamped to the end stops.
pub fn sample_stops(stops: &[GradientStop], t: f32) -> Rgba {
    let Some(first) = stops.first() else { return crate::ui::color::TRANSPARENT; };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let k = if span <= f32::EPSILON { 1.0 } else { (t - a.offset) / span };
            let mut out = [0.0; 4];
            for i in 0..4 {
                out[i] = a.color[i] + (b.color[i] - a.color[i]) * k;
            }
            return out;
        }
    }
    stops[stops.len() - 1].color
}
