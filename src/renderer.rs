//! Console renderer: prints each published [`ReadinessView`].
//!
//! Nothing is printed while the view is resolving, so a half-known state
//! never reaches the screen.

use std::io::{self, Write};

use lf_core::{DisplayState, ReadinessView, StageCatalog};

const BAR_WIDTH: usize = 30;

pub struct ConsoleRenderer<W: Write> {
    out: W,
    catalog: StageCatalog,
    last: Option<String>,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, catalog: StageCatalog) -> Self {
        Self {
            out,
            catalog,
            last: None,
        }
    }

    /// Render `view`, skipping frames identical to the previous one.
    /// Returns whether anything was written.
    pub fn render(&mut self, view: &ReadinessView) -> io::Result<bool> {
        let Some(frame) = render_frame(view, &self.catalog) else {
            return Ok(false);
        };
        if self.last.as_deref() == Some(frame.as_str()) {
            return Ok(false);
        }

        let timestamp = chrono::Local::now().format("%H:%M:%S");
        writeln!(self.out, "[{timestamp}] {frame}")?;
        self.out.flush()?;
        self.last = Some(frame);
        Ok(true)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Text for one view, `None` while resolving.
pub fn render_frame(view: &ReadinessView, catalog: &StageCatalog) -> Option<String> {
    if view.is_resolving {
        return None;
    }
    let display = view.display.as_ref()?;
    let project = view
        .project
        .as_ref()
        .map(|id| format!("project {id}"))
        .unwrap_or_else(|| "no project".to_string());

    let body = match display {
        DisplayState::Login => "Sign in to continue".to_string(),
        DisplayState::CreateProject => "Create your first project".to_string(),
        DisplayState::NeedIntegration => {
            "Connect your YouTube channel to start processing".to_string()
        }
        DisplayState::IntegrationDisabled => {
            "Your integration was disconnected. Reconnect it to resume".to_string()
        }
        DisplayState::Dashboard => "Dashboard".to_string(),
        DisplayState::Error { message } => format!("Error: {message} (press r to retry)"),
        DisplayState::SetupProcessing {
            stage,
            message,
            progress_percent,
        } => {
            let mut text = format!(
                "Setting up: {message}\n  {} {progress_percent}%",
                progress_bar(*progress_percent)
            );
            for step in catalog.steps(*stage) {
                let marker = if step.completed {
                    "[x]"
                } else if step.active {
                    "[>]"
                } else {
                    "[ ]"
                };
                text.push_str(&format!("\n  {marker} {}. {}", step.number, step.label));
            }
            text
        }
    };

    Some(format!("{project}: {body}"))
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}
