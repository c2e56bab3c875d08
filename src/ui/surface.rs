//! Abstract display surface for progress rendering
//!
//! The progress tracker renders through this trait so it can draw to a live
//! terminal, stay silent in batch mode, or write into a buffer under test.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Title,
    Ok,
    Warn,
    Err,
    BarFilled,
    BarEmpty,
}

pub trait Surface {
    /// Whether a human is watching: gates live re-renders and the final
    /// acknowledgment checkpoint.
    fn interactive(&self) -> bool;

    /// Width in columns available for the progress bars.
    fn width(&self) -> usize;

    /// Start a fresh frame (clears the previous one on a terminal).
    fn begin_frame(&mut self);

    fn put(&mut self, text: &str, style: Style);

    fn end_frame(&mut self);

    /// Block until the operator acknowledges the final summary with 'q'.
    /// Non-interactive surfaces return immediately.
    fn ack(&mut self) -> Result<()>;
}

/// Live terminal surface: colored output, whole-screen frames, keypress
/// acknowledgment.
pub struct TerminalSurface {
    width: usize,
}

impl TerminalSurface {
    pub fn new() -> Self {
        let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
        Self { width }
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn interactive(&self) -> bool {
        true
    }

    fn width(&self) -> usize {
        self.width.saturating_sub(2).max(20)
    }

    fn begin_frame(&mut self) {
        // ANSI clear + home; a full alternate-screen TUI is more than this
        // display needs.
        print!("\x1b[2J\x1b[H");
    }

    fn put(&mut self, text: &str, style: Style) {
        match style {
            Style::Plain => print!("{}", text),
            Style::Title => print!("{}", text.bold()),
            Style::Ok => print!("{}", text.green()),
            Style::Warn => print!("{}", text.yellow()),
            Style::Err => print!("{}", text.red().bold()),
            Style::BarFilled => print!("{}", text.black().on_green()),
            Style::BarEmpty => print!("{}", text.on_bright_black()),
        }
    }

    fn end_frame(&mut self) {
        let _ = std::io::stdout().flush();
    }

    fn ack(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        let result = loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            }
        };
        terminal::disable_raw_mode()?;
        result
    }
}

/// Batch-mode surface: absorbs every render; the operational log carries the
/// summary instead.
pub struct PlainSurface;

impl Surface for PlainSurface {
    fn interactive(&self) -> bool {
        false
    }

    fn width(&self) -> usize {
        78
    }

    fn begin_frame(&mut self) {}

    fn put(&mut self, _text: &str, _style: Style) {}

    fn end_frame(&mut self) {}

    fn ack(&mut self) -> Result<()> {
        Ok(())
    }
}
