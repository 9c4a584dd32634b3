// src/core/gfx/backends/recorder.rs
use crate::core::gfx::{Capabilities, LinearGradient, RadialGradient, Rect, Stroke};
use crate::ui::color::Rgba;

/// One primitive call, as issued by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    FillRect(Rect, Rgba),
    LinearGradient(Rect, LinearGradient),
    RadialGradient(Rect, RadialGradient),
    Stroke(Stroke),
}

/// Surface that draws nothing and remembers every call. Used for dry runs and tests.
pub struct Recorder {
    width: u32,
    height: u32,
    capabilities: Capabilities,
    commands: Vec<DrawCommand>,
}

impl Recorder {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_capabilities(width, height, Capabilities::ALL)
    }

    pub fn with_capabilities(width: u32, height: u32, capabilities: Capabilities) -> Self {
        Self { width, height, capabilities, commands: Vec::new() }
    }

    #[inline(always)] pub fn capabilities(&self) -> Capabilities { self.capabilities }
    #[inline(always)] pub fn size(&self) -> (u32, u32) { (self.width, self.height) }
    #[inline(always)] pub fn commands(&self) -> &[DrawCommand] { &self.commands }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Stroke(s) => Some(s),
            _ => None,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn clear(&mut self, color: Rgba) -> Result<(), String> {
        self.commands.push(DrawCommand::Clear(color));
        Ok(())
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) -> Result<(), String> {
        if !rect.is_finite() {
            return Err(format!("rectangle {:?} is not finite", rect));
        }
        self.commands.push(DrawCommand::FillRect(rect, color));
        Ok(())
    }

    pub fn fill_linear_gradient(&mut self, rect: Rect, gradient: &LinearGradient) -> Result<(), String> {
        self.commands.push(DrawCommand::LinearGradient(rect, gradient.clone()));
        Ok(())
    }

    pub fn fill_radial_gradient(&mut self, rect: Rect, gradient: &RadialGradient) -> Result<(), String> {
        self.commands.push(DrawCommand::RadialGradient(rect, gradient.clone()));
        Ok(())
    }

    pub fn stroke_line(&mut self, stroke: &Stroke) -> Result<(), String> {
        let finite = [stroke.from.x, stroke.from.y, stroke.to.x, stroke.to.y, stroke.width]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err("stroke geometry is not finite".to_string());
        }
        self.commands.push(DrawCommand::Stroke(*stroke));
        Ok(())
    }
}
