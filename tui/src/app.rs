//! Main Application
//!
//! The App struct owns the [`ChatSession`] and runs the terminal loop:
//! - Event loop (keyboard, mouse, resize)
//! - Transport events from the streaming channel
//! - Results of image uploads running in spawned tasks
//!
//! The session is only ever touched from this loop. Background work posts
//! its results on channels and the loop applies them in arrival order.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

use streamchat_core::image::extension_for;
use streamchat_core::{
    decode_data_uri, ChatConfig, ChatSession, Feedback, HttpImageUploader, ImageAttachment,
    ImageError, ImageUploader, Message, MessageId, SendError, TransportEvent, UploadError,
    UploadReply, UploadTicket, WebSocketChannel,
};

use crate::composer::{parse_input, Composer, ComposerCommand};
use crate::display::{loading_line, message_lines, StyledLine};
use crate::theme::{
    CONNECTED_GREEN, DIM_GRAY, DISCONNECTED_RED, HEADER_BG, NOTICE_YELLOW, USER_BLUE,
};

/// Composer height: one header line plus the input
const COMPOSER_HEIGHT: u16 = 4;

/// Redraw interval while idle, drives the loading indicator
const TICK: Duration = Duration::from_millis(250);

/// Lines moved per mouse wheel step
const SCROLL_STEP: usize = 3;

/// Queue depth for transport events
const EVENT_QUEUE: usize = 256;

/// Shown for every failed upload request
pub const UPLOAD_FAILED_NOTICE: &str = "An error occurred while uploading the image.";

/// Result of an upload task
type UploadOutcome = (UploadTicket, Result<UploadReply, UploadError>);

/// Receivers drained by the run loop
struct Inbox {
    events: mpsc::Receiver<TransportEvent>,
    uploads: mpsc::Receiver<UploadOutcome>,
}

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,
    /// The conversation
    session: ChatSession<WebSocketChannel, HttpImageUploader>,
    /// Where we are talking to
    server: String,

    // === Channels ===
    events_tx: mpsc::Sender<TransportEvent>,
    uploads_tx: mpsc::Sender<UploadOutcome>,
    inbox: Option<Inbox>,

    // === Input State ===
    composer: Composer,
    /// Selected message, for feedback and previews
    selected: Option<MessageId>,
    /// Scroll offset (lines from bottom, 0 = latest)
    scroll_offset: usize,
    /// Total rendered lines (for scroll bounds)
    total_lines: usize,
    /// Last conversation height, for paging
    page_height: usize,

    // === Misc State ===
    /// One-shot status notification
    notice: Option<String>,
    /// Animation counter
    tick: u64,
}

impl App {
    /// Create a new App instance from resolved configuration
    pub fn new(config: &ChatConfig) -> Self {
        let channel = WebSocketChannel::new(config.websocket_url(), config.connect_timeout);
        let uploader = HttpImageUploader::new(config.upload_url());
        let session =
            ChatSession::new(channel, uploader).with_max_image_bytes(config.max_image_bytes);

        let (events_tx, events) = mpsc::channel(EVENT_QUEUE);
        let (uploads_tx, uploads) = mpsc::channel(4);

        Self {
            running: true,
            session,
            server: config.base_url.clone(),
            events_tx,
            uploads_tx,
            inbox: Some(Inbox { events, uploads }),
            composer: Composer::new(),
            selected: None,
            scroll_offset: 0,
            total_lines: 0,
            page_height: 10,
            notice: None,
            tick: 0,
        }
    }

    /// Main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let mut inbox = self
            .inbox
            .take()
            .ok_or_else(|| anyhow!("App::run called twice"))?;

        // Create async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();

        // Render initial frame immediately so user sees UI
        self.render(terminal)?;
        self.connect().await;
        self.render(terminal)?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_terminal_event(event).await,
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                    None => self.running = false,
                },

                Some(event) = inbox.events.recv() => {
                    self.session.handle_event(event);
                }

                Some((ticket, result)) = inbox.uploads.recv() => {
                    self.finish_upload(ticket, result);
                }

                _ = tokio::time::sleep(TICK) => {
                    self.tick = self.tick.wrapping_add(1);
                }
            }

            self.render(terminal)?;
        }

        if let Err(e) = self.session.shutdown().await {
            tracing::debug!(error = %e, "Channel already closed");
        }
        Ok(())
    }

    /// Open the streaming channel, reporting failure in the status line
    async fn connect(&mut self) {
        match self.session.connect(self.events_tx.clone()).await {
            Ok(()) => {
                tracing::info!(server = %self.server, "Connected");
                self.notice = None;
            }
            Err(e) => {
                self.notice = Some(format!(
                    "Could not connect to {}: {e} (Ctrl+R to retry)",
                    self.server
                ));
            }
        }
    }

    async fn handle_terminal_event(&mut self, event: Event) {
        match event {
            // Only handle Press events (not Release or Repeat)
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key).await,
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    /// Handle keyboard input
    async fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            // Quit
            KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if ctrl => self.running = false,

            KeyCode::Char('r') if ctrl => {
                if self.session.connection().is_connected() {
                    self.notice = Some("Already connected".to_string());
                } else {
                    self.connect().await;
                }
            }

            // Feedback and previews on the selected message
            KeyCode::Char('l') if ctrl => self.rate_selected(Feedback::Like),
            KeyCode::Char('d') if ctrl => self.rate_selected(Feedback::Dislike),
            KeyCode::Char('o') if ctrl => self.open_selected().await,
            KeyCode::Tab => self.select(true),
            KeyCode::BackTab => self.select(false),

            KeyCode::Enter => self.submit().await,

            // Typing
            KeyCode::Char(c) if !ctrl => {
                if self.session.accepts_input() {
                    self.composer.push(c);
                }
            }
            KeyCode::Backspace => self.composer.backspace(),

            // Conversation scrolling
            KeyCode::PageUp => self.scroll_up(self.page_height / 2),
            KeyCode::PageDown => self.scroll_down(self.page_height / 2),

            _ => {}
        }
    }

    /// Handle mouse input
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_up(SCROLL_STEP),
            MouseEventKind::ScrollDown => self.scroll_down(SCROLL_STEP),
            _ => {}
        }
    }

    fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + lines.max(1)).min(max_scroll);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines.max(1));
    }

    // ========================================================================
    // Sending
    // ========================================================================

    async fn submit(&mut self) {
        if !self.session.accepts_input() || self.composer.is_empty() {
            return;
        }

        match parse_input(self.composer.text()) {
            ComposerCommand::Attach(path) => {
                self.composer.take_text();
                self.attach(&path).await;
            }
            ComposerCommand::Remove => {
                self.composer.take_text();
                if self.composer.take_attachment().is_some() {
                    self.notice = Some("Attachment removed".to_string());
                }
            }
            ComposerCommand::Usage(usage) => self.notice = Some(usage.to_string()),
            ComposerCommand::Submit(text) => {
                if let Some(image) = self.composer.take_attachment() {
                    self.composer.clear();
                    self.start_upload(image, &text);
                } else if !text.trim().is_empty() {
                    match self.session.send_text(&text).await {
                        Ok(_) => {
                            self.composer.clear();
                            self.scroll_offset = 0;
                            self.notice = None;
                        }
                        Err(e) => self.notice = Some(send_error_notice(&e)),
                    }
                }
            }
        }
    }

    /// Load an image into the composer, checking it right away
    async fn attach(&mut self, path: &Path) {
        let image = match ImageAttachment::from_path(path, self.session.max_image_bytes()).await {
            Ok(image) => image,
            Err(e) => {
                self.notice = Some(send_error_notice(&SendError::Image(e)));
                return;
            }
        };
        if let Err(e) = image.validate(self.session.max_image_bytes()) {
            self.notice = Some(send_error_notice(&SendError::Image(e)));
            return;
        }
        tracing::debug!(file = %image.file_name, bytes = image.size(), "Attached image");
        self.composer.attach(image);
        self.notice = None;
    }

    /// Validate and spawn the upload request
    fn start_upload(&mut self, image: ImageAttachment, text: &str) {
        let ticket = match self.session.begin_upload(image, text) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.notice = Some(send_error_notice(&e));
                return;
            }
        };

        let uploader = self.session.uploader().clone();
        let tx = self.uploads_tx.clone();
        tokio::spawn(async move {
            let result = uploader.upload(ticket.image(), ticket.message()).await;
            let _ = tx.send((ticket, result)).await;
        });
        self.notice = Some("Uploading image...".to_string());
    }

    fn finish_upload(&mut self, ticket: UploadTicket, result: Result<UploadReply, UploadError>) {
        match self.session.finish_upload(ticket, result) {
            Ok(()) => {
                self.scroll_offset = 0;
                self.notice = None;
            }
            Err(_) => self.notice = Some(UPLOAD_FAILED_NOTICE.to_string()),
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    fn select(&mut self, forward: bool) {
        self.selected = step_selection(self.session.messages(), self.selected, forward);
        if self.selected.is_none() {
            self.notice = Some("Nothing to select yet".to_string());
        }
    }

    fn rate_selected(&mut self, feedback: Feedback) {
        let Some(id) = self.selected else {
            self.notice = Some("Select a reply with Tab first".to_string());
            return;
        };
        if !self.session.set_feedback(id, feedback) {
            self.notice = Some("Only completed replies with metrics can be rated".to_string());
        }
    }

    async fn open_selected(&mut self) {
        let image = self
            .selected
            .and_then(|id| self.session.store().get(id))
            .and_then(|msg| msg.image.clone().map(|uri| (msg.id, uri)));
        let Some((id, uri)) = image else {
            self.notice = Some("The selected message has no image".to_string());
            return;
        };

        match open_preview(id, &uri).await {
            Ok(path) => tracing::debug!(path = %path.display(), "Opened preview"),
            Err(e) => self.notice = Some(format!("Could not open preview: {e}")),
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render the UI
    fn render(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        terminal.draw(|frame| self.draw(frame))?;
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let [header, conversation, composer, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(COMPOSER_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let buf = frame.buffer_mut();
        self.render_header(buf, header);
        self.render_conversation(buf, conversation);
        self.render_composer(buf, composer);
        self.render_status(buf, status);
    }

    fn render_header(&self, buf: &mut Buffer, area: Rect) {
        buf.set_style(area, Style::default().bg(HEADER_BG));
        if area.width < 32 {
            return;
        }
        buf.set_string(
            area.x + 1,
            area.y,
            "streamchat",
            Style::default().bg(HEADER_BG).add_modifier(Modifier::BOLD),
        );

        let connection = self.session.connection();
        let dot = if connection.is_connected() {
            CONNECTED_GREEN
        } else {
            DISCONNECTED_RED
        };
        buf.set_string(area.x + 13, area.y, "●", Style::default().bg(HEADER_BG).fg(dot));
        buf.set_string(
            area.x + 15,
            area.y,
            connection.description(),
            Style::default().bg(HEADER_BG),
        );

        let server_width = self.server.width() as u16;
        if area.width > server_width + 32 {
            buf.set_string(
                area.x + area.width - server_width - 1,
                area.y,
                &self.server,
                Style::default().bg(HEADER_BG).fg(DIM_GRAY),
            );
        }
    }

    /// Render conversation pane
    fn render_conversation(&mut self, buf: &mut Buffer, area: Rect) {
        let width = area.width.saturating_sub(1) as usize;
        let height = area.height as usize;
        self.page_height = height;

        if width < 10 || height < 1 {
            return;
        }

        // Build wrapped lines from messages
        let mut all_lines: Vec<StyledLine> = Vec::new();
        for msg in self.session.messages() {
            let selected = self.selected == Some(msg.id);
            all_lines.extend(message_lines(msg, width, selected));
        }
        if self.session.turn().shows_loading() {
            all_lines.push(loading_line(self.tick));
        }

        self.total_lines = all_lines.len();

        // Clamp scroll offset
        let max_scroll = self.total_lines.saturating_sub(height);
        if self.scroll_offset > max_scroll {
            self.scroll_offset = max_scroll;
        }

        // Calculate visible range
        let visible_end = self.total_lines.saturating_sub(self.scroll_offset);
        let visible_start = visible_end.saturating_sub(height);

        for (i, (line, style)) in all_lines[visible_start..visible_end].iter().enumerate() {
            buf.set_stringn(area.x, area.y + i as u16, line, area.width as usize, *style);
        }
    }

    /// Render composer: attachment line over the input
    fn render_composer(&self, buf: &mut Buffer, area: Rect) {
        let label = self
            .composer
            .attachment_label()
            .unwrap_or_else(|| "─".repeat(area.width as usize));
        buf.set_stringn(area.x, area.y, &label, area.width as usize, Style::default().fg(DIM_GRAY));

        let text_height = area.height.saturating_sub(1) as usize;
        let text_width = area.width.saturating_sub(1) as usize;
        if text_width < 5 || text_height < 1 {
            return;
        }

        let (content, style) = if self.session.accepts_input() {
            (format!("> {}_", self.composer.text()), Style::default().fg(USER_BLUE))
        } else {
            (format!("> {}", self.input_hint()), Style::default().fg(DIM_GRAY))
        };

        let wrapped: Vec<String> = textwrap::wrap(&content, text_width)
            .iter()
            .map(ToString::to_string)
            .collect();
        let skip = wrapped.len().saturating_sub(text_height);
        for (i, line) in wrapped.iter().skip(skip).enumerate() {
            buf.set_string(area.x, area.y + 1 + i as u16, line, style);
        }
    }

    /// Why the composer is disabled
    fn input_hint(&self) -> &'static str {
        if !self.session.connection().is_connected() {
            "Disconnected. Ctrl+R to reconnect"
        } else if self.session.is_uploading() {
            "Uploading image..."
        } else {
            "Waiting for the reply..."
        }
    }

    /// Render status bar
    fn render_status(&self, buf: &mut Buffer, area: Rect) {
        let width = area.width as usize;
        if let Some(ref notice) = self.notice {
            let style = Style::default().fg(NOTICE_YELLOW);
            buf.set_stringn(area.x, area.y, format!(" {notice}"), width, style);
            return;
        }

        let status = status_hints(&self.composer, self.scroll_offset);
        buf.set_stringn(area.x, area.y, &status, width, Style::default().fg(DIM_GRAY));
    }
}

/// Whether Tab can land on this message
fn is_selectable(msg: &Message) -> bool {
    msg.accepts_feedback() || msg.image.is_some()
}

/// Move the selection among selectable messages, wrapping at both ends
///
/// With nothing selected (or the selection gone) the newest candidate wins.
pub fn step_selection(
    messages: &[Message],
    current: Option<MessageId>,
    forward: bool,
) -> Option<MessageId> {
    let candidates: Vec<MessageId> = messages
        .iter()
        .filter(|m| is_selectable(m))
        .map(|m| m.id)
        .collect();
    let last = candidates.len().checked_sub(1)?;
    let index = match current.and_then(|id| candidates.iter().position(|c| *c == id)) {
        None => last,
        Some(i) if forward => (i + 1) % candidates.len(),
        Some(0) => last,
        Some(i) => i - 1,
    };
    Some(candidates[index])
}

/// Key hints for the status line
///
/// A pending image changes what Enter does, so the first hint follows it.
pub fn status_hints(composer: &Composer, scroll_offset: usize) -> String {
    let enter = match composer.attachment() {
        Some(_) => "Enter upload image",
        None => "Enter send",
    };
    let mut status = format!(
        " {enter} | /image <path> | Tab select | Ctrl+L/D rate | Ctrl+O open | Esc quit"
    );
    if scroll_offset > 0 {
        status.push_str(&format!(" [^{scroll_offset} lines]"));
    }
    status
}

/// Status line text for a refused or failed send
pub fn send_error_notice(err: &SendError) -> String {
    match err {
        SendError::Image(ImageError::NotAnImage { .. }) => {
            "Please upload a valid image file.".to_string()
        }
        SendError::Image(ImageError::TooLarge { limit, .. }) => {
            format!("Image size should be less than {}.", format_limit(*limit))
        }
        SendError::Upload(_) => UPLOAD_FAILED_NOTICE.to_string(),
        other => other.to_string(),
    }
}

fn format_limit(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Write a stored preview to the temp dir and hand it to the system viewer
async fn open_preview(id: MessageId, data_uri: &str) -> anyhow::Result<PathBuf> {
    let (media_type, bytes) = decode_data_uri(data_uri)?;
    let path = std::env::temp_dir().join(format!("streamchat-{id}.{}", extension_for(&media_type)));
    tokio::fs::write(&path, bytes).await?;
    open::that_detached(&path)?;
    Ok(path)
}
