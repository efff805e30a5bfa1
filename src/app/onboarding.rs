//! Genesis flow — collect a name and a personality score, then deploy.
//!
//! Two stages: free-text name entry, then a 0–100 slider tuned with the
//! arrow keys. Enter advances; deployment is one-way.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::App;

/// Coarse slider step for a plain arrow press.
const SLIDER_STEP: u8 = 5;
/// Fine step while Shift is held.
const SLIDER_FINE_STEP: u8 = 1;
/// Longest accepted agent name.
const MAX_NAME_LEN: usize = 24;

/// Where the genesis flow currently stands.
pub enum Onboarding {
    Name { buffer: String },
    Personality { name: String, score: u8 },
}

impl Default for Onboarding {
    fn default() -> Self {
        Onboarding::Name {
            buffer: String::new(),
        }
    }
}

impl App {
    /// Handle a key press while no profile is deployed yet.
    pub(crate) fn handle_onboarding_key(&mut self, key: KeyEvent) {
        match &mut self.onboarding {
            Onboarding::Name { buffer } => match key.code {
                KeyCode::Char(ch) => {
                    if ch.is_ascii() && !ch.is_ascii_control() && buffer.len() < MAX_NAME_LEN {
                        buffer.push(ch);
                    }
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Enter => {
                    let name = buffer.trim().to_string();
                    if !name.is_empty() {
                        self.onboarding = Onboarding::Personality { name, score: 50 };
                    }
                }
                KeyCode::Esc => self.should_quit = true,
                _ => {}
            },
            Onboarding::Personality { name, score } => {
                let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
                    SLIDER_FINE_STEP
                } else {
                    SLIDER_STEP
                };
                match key.code {
                    KeyCode::Left => *score = score.saturating_sub(step),
                    KeyCode::Right => *score = (*score + step).min(100),
                    KeyCode::Enter => {
                        let name = name.clone();
                        let score = *score;
                        self.deploy_profile(name, score);
                    }
                    KeyCode::Esc => self.should_quit = true,
                    _ => {}
                }
            }
        }
    }
}
