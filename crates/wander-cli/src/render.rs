//! Plain-text rendering of controller events and log entries

use serde_json::Value;
use std::io::{self, Write};
use wander_agent::{ControllerEvent, EntryKind, InterruptContext, LogEntry, MAX_PROGRESS};
use wander_proto::{DestinationOption, InterruptKind};

use crate::utils::truncate_chars;

/// Writes conversation output as it is produced
pub struct Renderer<W: Write> {
    out: W,
    show_data: bool,
    completed: u32,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, show_data: bool) -> Self {
        Self {
            out,
            show_data,
            completed: 0,
        }
    }

    /// Render one controller event
    pub fn on_event(&mut self, event: &ControllerEvent) -> io::Result<()> {
        match event {
            ControllerEvent::Progress { completed, .. } => {
                self.completed = *completed;
                Ok(())
            }
            ControllerEvent::EntryAppended { entry } => {
                if let Some(text) = format_entry(entry, Some(self.completed), self.show_data) {
                    writeln!(self.out, "{}", text)?;
                    self.out.flush()?;
                }
                Ok(())
            }
            ControllerEvent::ConversationBound { conversation_id } => {
                tracing::debug!(%conversation_id, "Rendering bound conversation");
                Ok(())
            }
            ControllerEvent::StateChanged { .. } | ControllerEvent::SeasonObserved { .. } => Ok(()),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format a log entry for display. User entries are not echoed.
///
/// Progress steps are prefixed with the stage count when `completed` is known.
pub fn format_entry(entry: &LogEntry, completed: Option<u32>, show_data: bool) -> Option<String> {
    let text = match entry.kind {
        EntryKind::User => return None,
        EntryKind::AgentMessage => entry.content.clone(),
        EntryKind::ProgressStep => {
            let step = entry
                .step
                .as_deref()
                .filter(|step| !step.is_empty())
                .or(entry.stage.map(|stage| stage.as_str()))
                .unwrap_or("working");
            let mut text = match completed {
                Some(completed) => format!("[{}/{}] {}", completed, MAX_PROGRESS, step),
                None => format!("- {}", step),
            };
            if !entry.content.is_empty() {
                text.push_str(": ");
                text.push_str(&entry.content);
            }
            if show_data {
                if let Some(data) = &entry.data {
                    text.push('\n');
                    text.push_str(&indent(&pretty(data), "    "));
                }
            }
            text
        }
        // the options follow when the prompt is shown
        EntryKind::Interrupt => format!("? {}", entry.content),
        EntryKind::Result => format_result(entry, show_data),
        EntryKind::Error => format!("Error: {}", entry.content),
    };
    Some(text)
}

fn format_result(entry: &LogEntry, show_data: bool) -> String {
    let mut text = entry.content.clone();
    let Some(data) = &entry.data else {
        return text;
    };

    if let Some(itinerary) = data.get("itinerary").filter(|v| !v.is_null()) {
        let destination = itinerary.get("destination").and_then(Value::as_str);
        let days = itinerary.get("duration_days").and_then(Value::as_u64);
        match (destination, days) {
            (Some(destination), Some(days)) => {
                text.push_str(&format!("\n  {} ({} days)", destination, days))
            }
            (Some(destination), None) => text.push_str(&format!("\n  {}", destination)),
            _ => {}
        }
        if show_data {
            text.push('\n');
            text.push_str(&indent(&pretty(itinerary), "    "));
        }
    }
    if let Some(id) = data.get("itinerary_id").and_then(Value::as_str) {
        text.push_str(&format!("\n  Saved as itinerary {}", id));
    }
    text
}

/// Format the whole log, user messages included
pub fn format_history<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
    show_data: bool,
) -> String {
    entries
        .into_iter()
        .filter_map(|entry| match entry.kind {
            EntryKind::User => Some(format!("> {}", entry.content)),
            _ => format_entry(entry, None, show_data),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the choices of an open interrupt
pub fn format_interrupt(context: &InterruptContext) -> String {
    let mut lines = Vec::new();
    match context.kind {
        InterruptKind::DestinationSelection => {
            for (i, option) in context.options.iter().enumerate() {
                lines.push(format_option(i, option));
            }
            lines.push(format!("Choose 1-{}:", context.options.len()));
        }
        InterruptKind::Question => {
            if !context.missing_info.is_empty() {
                lines.push(format!("  (still needed: {})", context.missing_info.join(", ")));
            }
        }
    }
    lines.join("\n")
}

fn format_option(position: usize, option: &DestinationOption) -> String {
    let mut line = format!("  {}. {}", position + 1, option.label(position));

    let mut details = Vec::new();
    if let Some(cost) = option.avg_daily_cost {
        details.push(format!("~${:.0}/day", cost));
    }
    if let Some(season) = &option.best_season {
        details.push(format!("best in {}", season));
    }
    if !details.is_empty() {
        line.push_str(&format!(" ({})", details.join(", ")));
    }
    if let Some(description) = &option.description {
        line.push_str(&format!("\n     {}", truncate_chars(description, 100)));
    }
    if !option.highlights.is_empty() {
        line.push_str(&format!("\n     {}", option.highlights.join(" · ")));
    }
    line
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
