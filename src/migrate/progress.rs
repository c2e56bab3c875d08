//! Migration progress tracking and rendering
//!
//! A fresh step list is created for every run. The execution engine reports
//! into the tracker through [`ProgressSink`]; the tracker aggregates the
//! heterogeneous step counters into one top-level percentage, re-renders on
//! every update while a human is watching, and writes the final summary to
//! the operational log in both modes.

use std::time::{Duration, Instant};

use crate::migrate::engine::{MigrationEngine, MigrationOutcome, MigrationStatus};
use crate::ui::{Style, Surface};

const NAME_COLUMN: usize = 15;

/// How far along one step is.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Known unit count: done out of total.
    Countable { done: u64, total: u64 },
    /// No known total; tracked as started/not-started with an artifact
    /// counter for display. Contributes weight 1 to the aggregate.
    Indeterminate { started: bool, artifacts: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    NotStarted,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub progress: Progress,
    pub errors: u64,
}

impl Step {
    pub fn countable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            progress: Progress::Countable { done: 0, total: 0 },
            errors: 0,
        }
    }

    pub fn indeterminate(name: &str) -> Self {
        Self {
            name: name.to_string(),
            progress: Progress::Indeterminate { started: false, artifacts: 0 },
            errors: 0,
        }
    }

    pub fn state(&self) -> StepState {
        match self.progress {
            // done >= total wins so a phase that finishes with nothing to
            // do (0/0) counts as complete.
            Progress::Countable { done, total } if done >= total => StepState::Complete,
            Progress::Countable { done: 0, .. } => StepState::NotStarted,
            Progress::Countable { .. } => StepState::InProgress,
            Progress::Indeterminate { started: true, .. } => StepState::Complete,
            Progress::Indeterminate { started: false, .. } => StepState::NotStarted,
        }
    }

    /// (done, total) contribution to the aggregate percentage.
    pub fn contribution(&self) -> (u64, u64) {
        match self.progress {
            Progress::Countable { done, total } => (done.min(total), total),
            Progress::Indeterminate { started, .. } => (u64::from(started), 1),
        }
    }

    /// Status glyph for a step line. Errors always win, even on a step that
    /// has since completed.
    pub fn glyph(&self) -> (&'static str, Style) {
        if self.errors > 0 {
            (" ! ", Style::Err)
        } else {
            match self.state() {
                StepState::Complete => (" + ", Style::Ok),
                StepState::NotStarted => ("   ", Style::Plain),
                StepState::InProgress => (" ~ ", Style::Warn),
            }
        }
    }

    fn stats_line(&self) -> String {
        let mut parts = Vec::new();
        match self.progress {
            Progress::Countable { done, total } => parts.push(format!("{}/{}", done, total)),
            Progress::Indeterminate { artifacts, .. } => {
                parts.push(format!("{} Total", artifacts))
            }
        }
        let mut line = format!("{:<width$}{}", self.name, parts.join(", "), width = NAME_COLUMN);
        if self.errors > 0 {
            line.push_str(", ");
        }
        line
    }
}

/// The standard phase list for a full migration.
pub fn standard_steps() -> Vec<Step> {
    vec![
        Step::countable("Repositories"),
        Step::countable("Groups"),
        Step::countable("Users"),
        Step::countable("Permissions"),
        Step::countable("Configurations"),
        Step::indeterminate("Artifacts"),
        Step::countable("Finalizing"),
    ]
}

/// One `update()` call's worth of deltas. Unset fields leave the step alone.
#[derive(Debug, Clone, Default)]
pub struct StepUpdate {
    pub total: Option<u64>,
    pub done: Option<u64>,
    pub add_done: u64,
    pub add_errors: u64,
    pub started: Option<bool>,
    pub add_artifacts: u64,
    pub detail: Option<String>,
}

impl StepUpdate {
    pub fn total(total: u64) -> Self {
        Self { total: Some(total), ..Self::default() }
    }

    pub fn advance(n: u64) -> Self {
        Self { add_done: n, ..Self::default() }
    }

    pub fn started() -> Self {
        Self { started: Some(true), ..Self::default() }
    }

    pub fn errors(n: u64) -> Self {
        Self { add_errors: n, ..Self::default() }
    }

    pub fn artifacts(n: u64) -> Self {
        Self { add_artifacts: n, ..Self::default() }
    }

    /// Attach a "currently migrating ..." line shown under the active bar.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }
}

/// The update sink handed to the migration engine.
pub trait ProgressSink {
    fn update(&mut self, step: &str, update: StepUpdate);
}

pub struct ProgressTracker<'a> {
    steps: Vec<Step>,
    surface: &'a mut dyn Surface,
    started: Option<Instant>,
    running: bool,
    detail: Option<String>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(surface: &'a mut dyn Surface) -> Self {
        Self::with_steps(surface, standard_steps())
    }

    pub fn with_steps(surface: &'a mut dyn Surface, steps: Vec<Step>) -> Self {
        Self {
            steps,
            surface,
            started: None,
            running: false,
            detail: None,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    /// Drive one full migration run: first render, hand control to the
    /// engine with this tracker as its sink, then the final summary.
    pub fn run(
        &mut self,
        engine: &mut dyn MigrationEngine,
        plan: &crate::config::Snapshot,
    ) -> MigrationOutcome {
        self.begin();
        let (status, message) = engine.migrate(self, plan);
        let outcome = MigrationOutcome {
            status,
            message,
            elapsed: self.elapsed(),
        };
        self.finish(&outcome);
        outcome
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
        self.running = true;
        log::info!("migration run started");
        if self.surface.interactive() {
            self.render(None);
        }
    }

    /// Stop the clock, show the final summary, and block on the operator's
    /// acknowledgment when interactive. The equivalent text summary goes to
    /// the operational log in every mode.
    pub fn finish(&mut self, outcome: &MigrationOutcome) {
        self.running = false;
        self.detail = None;
        if self.surface.interactive() {
            self.render(Some(outcome));
            if let Err(e) = self.surface.ack() {
                log::warn!("could not read acknowledgment keypress: {:#}", e);
            }
        }
        log::info!("{}", self.summary(outcome));
    }

    fn aggregate(&self) -> (u64, u64, u64) {
        let mut done = 0;
        let mut total = 0;
        let mut errors = 0;
        for step in &self.steps {
            let (d, t) = step.contribution();
            done += d;
            total += t;
            errors += step.errors;
        }
        (done, total, errors)
    }

    /// The step whose bar is shown under the total: the first in-progress
    /// step in declared order, else the first not-started step while the run
    /// is live, else none.
    fn active(&self) -> Option<&Step> {
        if let Some(step) = self.steps.iter().find(|s| s.state() == StepState::InProgress) {
            return Some(step);
        }
        if self.running {
            self.steps.iter().find(|s| s.state() == StepState::NotStarted)
        } else {
            None
        }
    }

    fn render(&mut self, result: Option<&MigrationOutcome>) {
        let width = self.surface.width();
        self.surface.begin_frame();
        self.surface.put("Running Migration ...\n", Style::Title);
        for step in &self.steps {
            let (glyph, style) = step.glyph();
            self.surface.put(glyph, style);
            self.surface.put(&step.stats_line(), Style::Plain);
            if step.errors > 0 {
                self.surface.put(&format!("{} Errors", step.errors), Style::Err);
            }
            self.surface.put("\n", Style::Plain);
        }
        let (done, total, _) = self.aggregate();
        self.surface.put("\n Total Progress:\n", Style::Plain);
        self.render_bar(done, total, width);
        match result {
            Some(outcome) => {
                let secs = round_secs(outcome.elapsed);
                match outcome.status {
                    MigrationStatus::Success => {
                        self.surface.put("\n Migration Successful!", Style::Ok)
                    }
                    MigrationStatus::Failure => {
                        let msg = format!("\n Migration Failed: {}", outcome.message);
                        self.surface.put(&msg, Style::Err)
                    }
                }
                let msg = format!(
                    "\n Completed in {}\n\n Press 'q' to continue.\n",
                    format_elapsed(secs)
                );
                self.surface.put(&msg, Style::Plain);
            }
            None => {
                if let Some(step) = self.active() {
                    let (done, total) = step.contribution();
                    let header = format!("\n {} Progress:\n", step.name);
                    let detail = self.detail.clone();
                    self.surface.put(&header, Style::Plain);
                    self.render_bar(done, total, width);
                    if let Some(detail) = detail {
                        self.surface.put(&format!(" {}\n", detail), Style::Plain);
                    }
                }
            }
        }
        self.surface.end_frame();
    }

    fn render_bar(&mut self, done: u64, total: u64, width: usize) {
        let (bar, fill) = bar(done, total, width);
        self.surface.put(" ", Style::Plain);
        self.surface.put(&bar[..fill], Style::BarFilled);
        self.surface.put(&bar[fill..], Style::BarEmpty);
        self.surface.put("\n", Style::Plain);
    }

    /// Human-readable run summary, identical in content to the on-screen
    /// rendering. Appended to the operational log after every run.
    pub fn summary(&self, outcome: &MigrationOutcome) -> String {
        let mut lines = Vec::new();
        lines.push("\nMigration Summary:\n".to_string());
        for step in &self.steps {
            let (glyph, _) = step.glyph();
            let mut line = format!("{}{}", glyph, step.stats_line());
            if step.errors > 0 {
                line.push_str(&format!("{} Errors", step.errors));
            }
            lines.push(line);
        }
        lines.push(String::new());
        match outcome.status {
            MigrationStatus::Success => lines.push(" Migration Successful!".to_string()),
            MigrationStatus::Failure => {
                lines.push(format!(" Migration Failed: {}", outcome.message))
            }
        }
        lines.push(format!(
            " Completed in {}",
            format_elapsed(round_secs(outcome.elapsed))
        ));
        lines.join("\n")
    }
}

impl ProgressSink for ProgressTracker<'_> {
    fn update(&mut self, step: &str, update: StepUpdate) {
        let Some(target) = self.steps.iter_mut().find(|s| s.name == step) else {
            log::warn!("progress update for unknown step '{}'", step);
            return;
        };
        match &mut target.progress {
            Progress::Countable { done, total } => {
                if let Some(t) = update.total {
                    *total = t;
                }
                if let Some(d) = update.done {
                    *done = d;
                }
                *done += update.add_done;
                // Invariant: 0 <= done <= total.
                *done = (*done).min(*total);
            }
            Progress::Indeterminate { started, artifacts } => {
                if let Some(s) = update.started {
                    *started = s;
                }
                *artifacts += update.add_artifacts;
            }
        }
        target.errors += update.add_errors;
        if update.detail.is_some() {
            self.detail = update.detail;
        }
        if self.surface.interactive() {
            self.render(None);
        }
    }
}

fn round_secs(elapsed: Duration) -> u64 {
    ((elapsed.as_millis() + 500) / 1000) as u64
}

/// Aggregate percentage, rounded half-up. A zero total renders as 0% rather
/// than dividing by zero.
pub fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        (200 * done.min(total) + total) / (2 * total)
    }
}

/// Fixed-width progress bar: the percentage label centered over the bar, and
/// the length of the filled prefix.
pub fn bar(done: u64, total: u64, width: usize) -> (String, usize) {
    let label = format!("{}%", percent(done, total));
    let mut chars = vec![b' '; width.max(label.len())];
    let start = (chars.len() - label.len()) / 2;
    chars[start..start + label.len()].copy_from_slice(label.as_bytes());
    let fill = if total == 0 {
        0
    } else {
        ((2 * width as u64 * done.min(total) + total) / (2 * total)) as usize
    };
    // Safe: the buffer is pure ASCII.
    (String::from_utf8_lossy(&chars).into_owned(), fill.min(width))
}

/// Decompose seconds into days/hours/minutes/seconds. Once a higher unit is
/// non-zero all lower units are shown, zeros included; seconds always show.
pub fn format_elapsed(all_secs: u64) -> String {
    let (secs, all_mins) = (all_secs % 60, all_secs / 60);
    let (mins, all_hours) = (all_mins % 60, all_mins / 60);
    let (hours, days) = (all_hours % 24, all_hours / 24);
    let mut parts = Vec::new();
    let mut include = false;
    if days > 0 {
        include = true;
        parts.push(format!("{}d", days));
    }
    if include || hours > 0 {
        include = true;
        parts.push(format!("{}h", hours));
    }
    if include || mins > 0 {
        parts.push(format!("{}m", mins));
    }
    parts.push(format!("{}s", secs));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formatting_cascades_units() {
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(59), "59s");
        assert_eq!(format_elapsed(60), "1m 0s");
        assert_eq!(format_elapsed(61), "1m 1s");
        assert_eq!(format_elapsed(3599), "59m 59s");
        assert_eq!(format_elapsed(3600), "1h 0m 0s");
        assert_eq!(format_elapsed(86400), "1d 0h 0m 0s");
        assert_eq!(format_elapsed(90061), "1d 1h 1m 1s");
    }

    #[test]
    fn percent_rounds_and_survives_zero_total() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 5), 100);
    }

    #[test]
    fn bar_fills_proportionally_with_centered_label() {
        let (text, fill) = bar(1, 2, 40);
        assert_eq!(text.len(), 40);
        assert_eq!(fill, 20);
        let pad = (40 - "50%".len()) / 2;
        assert_eq!(&text[pad..pad + 3], "50%");

        let (text, fill) = bar(0, 0, 40);
        assert_eq!(fill, 0);
        assert!(text.contains("0%"));
    }

    #[test]
    fn aggregation_mixes_countable_and_indeterminate() {
        let mut steps = vec![
            Step::countable("Repositories"),
            Step::indeterminate("Artifacts"),
        ];
        steps[0].progress = Progress::Countable { done: 3, total: 10 };
        steps[1].progress = Progress::Indeterminate { started: true, artifacts: 42 };
        let (done, total): (u64, u64) = steps
            .iter()
            .map(Step::contribution)
            .fold((0, 0), |(d, t), (sd, st)| (d + sd, t + st));
        // Countable contributes (3, 10); indeterminate contributes (1, 1).
        assert_eq!((done, total), (4, 11));
    }

    #[test]
    fn step_states_follow_counters() {
        let mut step = Step::countable("Users");
        step.progress = Progress::Countable { done: 0, total: 4 };
        assert_eq!(step.state(), StepState::NotStarted);
        step.progress = Progress::Countable { done: 1, total: 4 };
        assert_eq!(step.state(), StepState::InProgress);
        step.progress = Progress::Countable { done: 4, total: 4 };
        assert_eq!(step.state(), StepState::Complete);

        let mut step = Step::indeterminate("Artifacts");
        assert_eq!(step.state(), StepState::NotStarted);
        step.progress = Progress::Indeterminate { started: true, artifacts: 0 };
        assert_eq!(step.state(), StepState::Complete);
    }

    #[test]
    fn zero_total_step_counts_as_complete() {
        // A phase with nothing selected finishes at 0/0.
        let step = Step::countable("Permissions");
        assert_eq!(step.state(), StepState::Complete);
        assert_eq!(step.glyph().0, " + ");
        assert_eq!(step.glyph().1, Style::Ok);
    }

    #[test]
    fn errors_always_render_the_error_glyph() {
        let mut step = Step::countable("Groups");
        step.progress = Progress::Countable { done: 5, total: 5 };
        step.errors = 2;
        // Complete, but errored: the error state wins.
        assert_eq!(step.state(), StepState::Complete);
        assert_eq!(step.glyph().0, " ! ");
        assert_eq!(step.glyph().1, Style::Err);
    }
}
