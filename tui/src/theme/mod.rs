//! Theme and Colors
//!
//! A slate palette with blue for the user and green/red/gray for sentiment.

use ratatui::style::Color;

// ============================================================================
// Conversation
// ============================================================================

/// User message text
pub const USER_BLUE: Color = Color::Rgb(96, 165, 250);

/// AI message text
pub const AI_TEXT: Color = Color::Rgb(226, 232, 240);

/// Timestamps, separators, hints
pub const DIM_GRAY: Color = Color::Rgb(100, 116, 139);

/// Streaming cursor
pub const CURSOR_BLUE: Color = Color::Rgb(59, 130, 246);

/// Selected message marker
pub const SELECTION_YELLOW: Color = Color::Rgb(234, 179, 8);

// ============================================================================
// Sentiment and Feedback
// ============================================================================

/// Positive sentiment, liked
pub const POSITIVE_GREEN: Color = Color::Rgb(74, 222, 128);

/// Negative sentiment, disliked
pub const NEGATIVE_RED: Color = Color::Rgb(248, 113, 113);

/// Neutral sentiment
pub const NEUTRAL_SLATE: Color = Color::Rgb(148, 163, 184);

// ============================================================================
// Chrome
// ============================================================================

/// Header background
pub const HEADER_BG: Color = Color::Rgb(30, 41, 59);

/// Connection indicator: up
pub const CONNECTED_GREEN: Color = Color::Rgb(34, 197, 94);

/// Connection indicator: down
pub const DISCONNECTED_RED: Color = Color::Rgb(239, 68, 68);

/// Status line notices
pub const NOTICE_YELLOW: Color = Color::Rgb(234, 179, 8);
