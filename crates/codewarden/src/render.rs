//! Mirror message rendering.
//!
//! Output format:
//!
//! ```text
//! # `     abc12     `
//! ⏳ <t:1700000240:R>
//! ```
//!
//! With several code variants each gets a numbered header line. The status
//! line is omitted for quiet entries.

use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Padding inside the fixed-width code span.
const CODE_PAD: &str = "     ";

/// Two-state display phase of a mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Ending,
}

impl Phase {
    pub fn glyph(self) -> &'static str {
        match self {
            Phase::Pending => "⏳",
            Phase::Ending => "🔚",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Phase::Pending => Phase::Ending,
            Phase::Ending => Phase::Pending,
        }
    }
}

/// Deadline marker on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownMarker {
    /// Rendered by the client as "in 3 minutes".
    Relative(DateTime<Utc>),
    /// Fixed window length, never changes.
    Static(Duration),
}

impl CountdownMarker {
    fn write_to(&self, out: &mut String) {
        match self {
            CountdownMarker::Relative(deadline) => {
                let _ = write!(out, "<t:{}:R>", deadline.timestamp());
            }
            CountdownMarker::Static(window) => {
                let secs = window.as_secs();
                let _ = write!(out, "`{}:{:02}`", secs / 60, secs % 60);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine {
    pub phase: Phase,
    pub marker: CountdownMarker,
}

/// Render the mirror body for `codes` (original spelling first).
pub fn render_mirror(codes: &[String], status: Option<StatusLine>) -> String {
    let mut out = String::new();

    match codes {
        [single] => {
            let _ = write!(out, "# `{CODE_PAD}{single}{CODE_PAD}`");
        }
        many => {
            for (i, code) in many.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                let _ = write!(out, "# {}. `{CODE_PAD}{code}{CODE_PAD}`", i + 1);
            }
        }
    }

    if let Some(status) = status {
        out.push('\n');
        out.push_str(status.phase.glyph());
        out.push(' ');
        status.marker.write_to(&mut out);
    }

    out
}
