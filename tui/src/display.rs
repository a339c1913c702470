//! Display Helpers
//!
//! Turns [`Message`] records into styled, wrapped lines for the
//! conversation pane. Everything here is a pure function of the message so
//! it can be tested without a terminal.

use chrono::Local;
use ratatui::style::{Modifier, Style};

use streamchat_core::{Feedback, Message, Metrics, Sender, Sentiment};

use crate::theme::{
    AI_TEXT, CURSOR_BLUE, DIM_GRAY, NEGATIVE_RED, NEUTRAL_SLATE, POSITIVE_GREEN,
    SELECTION_YELLOW, USER_BLUE,
};

/// A single rendered line
pub type StyledLine = (String, Style);

/// Appended to the text of a message that is still streaming
pub const STREAMING_CURSOR: &str = "▌";

/// Gutter in front of every message line
const GUTTER: &str = "  ";
/// Gutter marking the selected message
const SELECTED_GUTTER: &str = "▎ ";

/// Display role for messages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayRole {
    /// User input
    User,
    /// Backend reply
    Ai,
}

impl From<Sender> for DisplayRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => DisplayRole::User,
            Sender::Ai => DisplayRole::Ai,
        }
    }
}

impl DisplayRole {
    /// Get the prefix for this role
    pub fn prefix(&self) -> &'static str {
        match self {
            DisplayRole::User => "You: ",
            DisplayRole::Ai => "AI: ",
        }
    }

    /// Base style for message text
    pub fn style(&self) -> Style {
        match self {
            DisplayRole::User => Style::default().fg(USER_BLUE),
            DisplayRole::Ai => Style::default().fg(AI_TEXT),
        }
    }
}

/// Icon for a sentiment label; unknown labels get a plain bullet
pub fn sentiment_icon(metrics: &Metrics) -> &'static str {
    match metrics.sentiment_kind() {
        Some(Sentiment::Positive) => "😊",
        Some(Sentiment::Negative) => "😢",
        Some(Sentiment::Neutral) => "😐",
        None => "•",
    }
}

/// Style for a sentiment label
pub fn sentiment_style(metrics: &Metrics) -> Style {
    let color = match metrics.sentiment_kind() {
        Some(Sentiment::Positive) => POSITIVE_GREEN,
        Some(Sentiment::Negative) => NEGATIVE_RED,
        Some(Sentiment::Neutral) | None => NEUTRAL_SLATE,
    };
    Style::default().fg(color)
}

/// Feedback state as shown after the metrics
pub fn feedback_marker(feedback: Feedback) -> &'static str {
    match feedback {
        Feedback::Like => "[👍]",
        Feedback::Dislike => "[👎]",
        Feedback::None => "",
    }
}

/// `😊 positive · 42.5 ms · 1 words [👍]`
pub fn metrics_line(metrics: &Metrics, feedback: Feedback) -> String {
    let mut line = format!(
        "{} {} · {} ms · {} words",
        sentiment_icon(metrics),
        metrics.sentiment,
        metrics.response_time_ms,
        metrics.word_count
    );
    let marker = feedback_marker(feedback);
    if !marker.is_empty() {
        line.push(' ');
        line.push_str(marker);
    }
    line
}

/// Short label for an attached image preview
pub fn image_label(data_uri: &str) -> String {
    let media = data_uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|media| !media.is_empty())
        .unwrap_or("image");
    format!("[{media} attached, Ctrl+O to open]")
}

/// Wrap `text` to `width`, keeping explicit line breaks
fn wrap_into(lines: &mut Vec<StyledLine>, text: &str, width: usize, gutter: &str, style: Style) {
    for paragraph in text.split('\n') {
        if paragraph.is_empty() {
            lines.push((gutter.to_string(), style));
            continue;
        }
        for wrapped in textwrap::wrap(paragraph, width) {
            lines.push((format!("{gutter}{wrapped}"), style));
        }
    }
}

/// All lines for one message, followed by a blank separator
pub fn message_lines(msg: &Message, width: usize, selected: bool) -> Vec<StyledLine> {
    let role = DisplayRole::from(msg.sender);
    let gutter = if selected { SELECTED_GUTTER } else { GUTTER };
    let width = width.saturating_sub(gutter.chars().count()).max(10);
    let mut lines = Vec::new();

    if let Some(ref uri) = msg.image {
        lines.push((
            format!("{gutter}{}", image_label(uri)),
            Style::default().fg(DIM_GRAY).add_modifier(Modifier::ITALIC),
        ));
    }

    let mut text = format!("{}{}", role.prefix(), msg.response);
    if msg.is_streaming {
        text.push_str(STREAMING_CURSOR);
    }
    let style = if msg.is_streaming {
        role.style().fg(CURSOR_BLUE)
    } else {
        role.style()
    };
    wrap_into(&mut lines, &text, width, gutter, style);

    let time = msg.timestamp.with_timezone(&Local).format("%H:%M:%S");
    lines.push((format!("{gutter}{time}"), Style::default().fg(DIM_GRAY)));

    if msg.accepts_feedback() {
        if let Some(ref metrics) = msg.metrics {
            let mut style = sentiment_style(metrics);
            if selected {
                style = style.add_modifier(Modifier::BOLD);
            }
            lines.push((format!("{gutter}{}", metrics_line(metrics, msg.feedback)), style));
        }
    }

    if selected {
        if let Some(first) = lines.first_mut() {
            first.1 = first.1.fg(SELECTION_YELLOW);
        }
    }

    lines.push((String::new(), Style::default()));
    lines
}

/// Waiting indicator shown while a reply has not started
pub fn loading_line(tick: u64) -> StyledLine {
    let dots = ".".repeat((tick % 4) as usize);
    (
        format!("{GUTTER}AI is thinking{dots}"),
        Style::default().fg(DIM_GRAY).add_modifier(Modifier::ITALIC),
    )
}
