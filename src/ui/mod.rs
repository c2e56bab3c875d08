pub mod prompts;
pub mod surface;

pub use surface::{PlainSurface, Style, Surface, TerminalSurface};
