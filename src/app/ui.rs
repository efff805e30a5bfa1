//! Terminal UI rendering — genesis panel, header bar, transcript, input.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::constants::APP_NAME;

use super::App;
use super::onboarding::Onboarding;
use super::profile::AgentMode;

impl App {
    /// Render the full TUI frame.
    pub fn draw(&mut self, frame: &mut Frame<'_>) {
        if self.profile.is_none() {
            self.draw_onboarding(frame);
            return;
        }
        self.draw_session(frame);
    }

    // ── Session view ─────────────────────────────────────────────────

    fn draw_session(&mut self, frame: &mut Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(frame.area());

        // ── Header bar ───────────────────────────────────────────────
        let identity = self
            .profile
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let mut header_spans = vec![
            Span::styled(
                APP_NAME.to_uppercase(),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled("  IDENTITY: ", Style::default().fg(Color::DarkGray)),
            Span::styled(identity, Style::default().fg(Color::Magenta)),
            Span::styled("  INTEGRITY: 100%", Style::default().fg(Color::DarkGray)),
            Span::styled("  MODE: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                self.mode.label(),
                Style::default().fg(mode_color(self.mode)),
            ),
        ];
        if let Some(upload) = &self.pending_upload {
            header_spans.push(Span::styled(
                format!("  BUFFER: {}", upload.name),
                Style::default().fg(Color::Blue),
            ));
        }
        if self.busy {
            header_spans.push(Span::styled(
                "  ⟳ UPLINK",
                Style::default().fg(Color::Yellow),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(header_spans)), chunks[0]);

        // ── Transcript ───────────────────────────────────────────────
        let inner_width = chunks[1].width.saturating_sub(2);
        let inner_height = chunks[1].height.saturating_sub(2) as usize;

        // Build the transcript paragraph with wrapping so we can query its
        // rendered line count (ratatui 0.30 native API).
        let transcript_lines: Vec<Line> = self
            .transcript
            .entries()
            .iter()
            .flat_map(|message| message.render())
            .collect();
        // trim would eat the indentation on continuation and citation lines
        let transcript_paragraph =
            Paragraph::new(Text::from(transcript_lines)).wrap(Wrap { trim: false });

        let total_visual = transcript_paragraph.line_count(inner_width);
        let max_scroll = total_visual.saturating_sub(inner_height);

        // Clamp scroll_offset (lines from the bottom) to valid range.
        if (self.scroll_offset as usize) > max_scroll {
            self.scroll_offset = max_scroll as u16;
        }
        let top_row = max_scroll.saturating_sub(self.scroll_offset as usize) as u16;

        let scroll_indicator = if self.transcript.is_empty() {
            " Terminal · /help for commands ".to_string()
        } else if self.scroll_offset > 0 {
            format!(" Terminal [↑{}] ", self.scroll_offset)
        } else {
            " Terminal ".to_string()
        };

        let transcript_panel = transcript_paragraph
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(scroll_indicator),
            )
            .scroll((top_row, 0));
        frame.render_widget(transcript_panel, chunks[1]);

        // ── Input prompt ─────────────────────────────────────────────
        let input_title = if self.busy {
            " Command (uplink busy — input will queue) "
        } else {
            " Command "
        };
        let input_panel = Paragraph::new(self.input.text())
            .block(Block::default().borders(Borders::ALL).title(input_title));
        frame.render_widget(input_panel, chunks[2]);

        let input_width = chunks[2].width.saturating_sub(2) as usize;
        let cursor = self.input.cursor().min(input_width);
        frame.set_cursor_position(Position::new(
            chunks[2].x + 1 + cursor as u16,
            chunks[2].y + 1,
        ));
    }

    // ── Genesis view ─────────────────────────────────────────────────

    fn draw_onboarding(&mut self, frame: &mut Frame<'_>) {
        let area = centered(frame.area(), 60, 9);

        let mut lines = vec![
            Line::from(Span::styled(
                format!("{} // GENESIS", APP_NAME.to_uppercase()),
                Style::default().fg(Color::Cyan),
            )),
            Line::default(),
        ];

        match &self.onboarding {
            Onboarding::Name { buffer } => {
                lines.push(Line::from(Span::styled(
                    "DESIGNATE AGENT NAME:",
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::from(Span::styled(
                    format!("{buffer}_"),
                    Style::default().fg(Color::Magenta),
                )));
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "Enter to continue · Esc to abort",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Onboarding::Personality { name, score } => {
                lines.push(Line::from(Span::styled(
                    format!("TUNE {name}'S PERSONALITY:"),
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::from(Span::styled(
                    slider_bar(*score),
                    Style::default().fg(Color::Magenta),
                )));
                lines.push(Line::from(Span::styled(
                    "DEGEN ◁                                  ▷ ANALYST",
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "←/→ adjust (Shift for fine) · Enter to deploy",
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }

        let panel = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" AWAITING GENESIS PARAMETERS "),
        );
        frame.render_widget(panel, area);
    }
}

fn mode_color(mode: AgentMode) -> Color {
    match mode {
        AgentMode::Idle => Color::DarkGray,
        AgentMode::Trading => Color::Yellow,
        AgentMode::Social => Color::Magenta,
        AgentMode::Building => Color::Cyan,
    }
}

/// Render the 0–100 personality slider as a bar of fixed width.
fn slider_bar(score: u8) -> String {
    const WIDTH: usize = 40;
    let filled = usize::from(score) * WIDTH / 100;
    let mut bar = String::with_capacity(WIDTH + 8);
    bar.push('[');
    for idx in 0..WIDTH {
        bar.push(if idx < filled { '█' } else { '░' });
    }
    bar.push(']');
    bar.push_str(&format!(" {score:3}"));
    bar
}

/// Center a fixed-size rect inside `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
