//! The conversation transcript — an append-only, ordered message log.
//!
//! Messages are immutable once appended and nothing is ever reordered or
//! deleted, so the log is the single source of truth for what happened in
//! a session, in the order it happened.

use std::path::PathBuf;

use chrono::Local;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::gateway::Citation;

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
    System,
}

/// What the message body primarily is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
}

/// Structured payload attached to a message.
#[derive(Clone, Debug)]
pub enum Attachment {
    /// Path of an image written to disk.
    Image(PathBuf),
    /// Sources that grounded the reply.
    Citations(Vec<Citation>),
}

/// One entry in the conversation log.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub body: String,
    pub kind: MessageKind,
    pub attachment: Option<Attachment>,
    pub timestamp: String,
}

/// Append-only conversation store.
#[derive(Default)]
pub struct Transcript {
    entries: Vec<Message>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript::default()
    }

    /// Append a message and return its id. Ids are strictly increasing, so
    /// log order always equals append order.
    pub fn push(
        &mut self,
        role: Role,
        body: impl Into<String>,
        kind: MessageKind,
        attachment: Option<Attachment>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(last) = self.entries.last() {
            debug_assert!(last.id < id, "ids must stay monotonic");
        }
        self.entries.push(Message {
            id,
            role,
            body: body.into(),
            kind,
            attachment,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        });
        id
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Citations of the most recent message that carries any.
    pub fn latest_citations(&self) -> Option<&[Citation]> {
        self.entries.iter().rev().find_map(|message| {
            match &message.attachment {
                Some(Attachment::Citations(citations)) => Some(citations.as_slice()),
                _ => None,
            }
        })
    }
}

// ── Rendering ────────────────────────────────────────────────────────

impl Message {
    /// Render this message as terminal lines.
    pub fn render(&self) -> Vec<Line<'_>> {
        let (prefix, style) = match (self.role, self.kind) {
            (Role::User, _) => ("❯ ", Style::default().fg(Color::Cyan)),
            (Role::Agent, MessageKind::Image) => ("▣ ", Style::default().fg(Color::Green)),
            (Role::Agent, MessageKind::Text) => ("◆ ", Style::default().fg(Color::Green)),
            (Role::System, _) => ("▲ ", Style::default().fg(Color::Yellow)),
        };

        let mut lines = Vec::new();
        for (idx, body_line) in self.body.lines().enumerate() {
            if idx == 0 {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{} ", self.timestamp),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(prefix, style),
                    Span::styled(body_line, style),
                ]));
            } else {
                lines.push(Line::from(vec![
                    Span::raw("           "),
                    Span::styled(body_line, style),
                ]));
            }
        }
        if self.body.is_empty() {
            lines.push(Line::from(Span::styled(prefix, style)));
        }

        match &self.attachment {
            Some(Attachment::Image(path)) => {
                lines.push(Line::from(Span::styled(
                    format!("           ⇒ saved {}", path.display()),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Some(Attachment::Citations(citations)) => {
                for (idx, citation) in citations.iter().enumerate() {
                    let detail = match &citation.uri {
                        Some(uri) => format!("           [{}] {} — {}", idx + 1, citation.title, uri),
                        None => format!("           [{}] {}", idx + 1, citation.title),
                    };
                    lines.push(Line::from(Span::styled(
                        detail,
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            None => {}
        }

        lines
    }
}
