use std::error::Error;
use std::fmt;

/// Fatal errors: the engine or the headless host cannot continue.
#[derive(Debug)]
pub enum IntroError {
    /// Bad configuration, or a drawing surface that is missing or lacks a primitive.
    Configuration(String),
    Io(std::io::Error),
    Image(image::ImageError),
    Audio(String),
}

impl fmt::Display for IntroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {}", msg),
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::Image(e) => write!(f, "image error: {}", e),
            Self::Audio(msg) => write!(f, "audio error: {}", msg),
        }
    }
}

impl Error for IntroError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IntroError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<image::ImageError> for IntroError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

/// A single particle or road mark that could not be drawn this frame.
/// Logged and skipped; never stops the frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderWarning {
    NonFiniteProjection { element: &'static str, index: usize },
    Surface { element: &'static str, index: usize, reason: String },
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteProjection { element, index } => {
                write!(f, "{} #{} projected to a non-finite point; skipped", element, index)
            }
            Self::Surface { element, index, reason } => {
                write!(f, "{} #{} failed to draw: {}", element, index, reason)
            }
        }
    }
}

impl Error for RenderWarning {}
