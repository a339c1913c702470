//! Composer
//!
//! The input line at the bottom of the screen and the image waiting to be
//! sent with it.

use std::path::PathBuf;

use streamchat_core::ImageAttachment;

/// What pressing Enter asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComposerCommand {
    /// Send the text (with the attachment, if any)
    Submit(String),
    /// Load and attach the image at this path
    Attach(PathBuf),
    /// Drop the current attachment
    Remove,
    /// A slash command used wrongly
    Usage(&'static str),
}

/// Interpret a line typed into the composer
///
/// Only `/image <path>` and `/remove` are commands; anything else is text.
pub fn parse_input(input: &str) -> ComposerCommand {
    let trimmed = input.trim();
    if let Some(rest) = trimmed.strip_prefix("/image") {
        if rest.is_empty() {
            return ComposerCommand::Usage("Usage: /image <path>");
        }
        if rest.starts_with(char::is_whitespace) {
            return ComposerCommand::Attach(PathBuf::from(rest.trim()));
        }
    }
    if trimmed == "/remove" {
        return ComposerCommand::Remove;
    }
    ComposerCommand::Submit(input.to_string())
}

/// Input buffer plus pending attachment
#[derive(Debug, Default)]
pub struct Composer {
    input: String,
    attachment: Option<ImageAttachment>,
}

impl Composer {
    /// Create an empty composer
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text
    pub fn text(&self) -> &str {
        &self.input
    }

    /// Append a typed character
    pub fn push(&mut self, c: char) {
        self.input.push(c);
    }

    /// Remove the last character
    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// Take the text, leaving the buffer empty
    pub fn take_text(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    /// The pending image
    pub fn attachment(&self) -> Option<&ImageAttachment> {
        self.attachment.as_ref()
    }

    /// Replace the pending image
    pub fn attach(&mut self, image: ImageAttachment) {
        self.attachment = Some(image);
    }

    /// Drop the pending image, returning it
    pub fn take_attachment(&mut self) -> Option<ImageAttachment> {
        self.attachment.take()
    }

    /// Clear text and attachment
    pub fn clear(&mut self) {
        self.input.clear();
        self.attachment = None;
    }

    /// Whether there is nothing to send
    pub fn is_empty(&self) -> bool {
        self.input.trim().is_empty() && self.attachment.is_none()
    }

    /// One-line summary of the attachment for the composer header
    pub fn attachment_label(&self) -> Option<String> {
        self.attachment().map(|image| {
            format!(
                "📎 {} ({}, {:.2} MB) /remove to drop",
                image.file_name,
                image.media_type,
                image.size_mb()
            )
        })
    }
}
