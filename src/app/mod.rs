//! Application core — session state, lifecycle, and event dispatch.
//!
//! The [`App`] struct holds all runtime state and is the single entry point
//! for the rest of the binary.  Heavy concerns are delegated to focused
//! submodules:
//!
//! | Module       | Responsibility                               |
//! |--------------|----------------------------------------------|
//! | `router`     | Utterance → capability classification        |
//! | `turn`       | Background capability calls & turn events    |
//! | `transcript` | Append-only conversation log & rendering     |
//! | `profile`    | Agent identity and derived modes             |
//! | `onboarding` | Genesis flow (name → personality → deploy)   |
//! | `commands`   | Slash-command dispatch & handlers            |
//! | `input`      | Text-input editing (cursor, history, etc.)   |
//! | `ui`         | TUI rendering & header helpers               |

mod commands;
pub(crate) mod input;
pub(crate) mod onboarding;
pub(crate) mod profile;
mod router;
pub(crate) mod transcript;
pub(crate) mod turn;
mod ui;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEventKind};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::constants::{HANDSHAKE_PROMPT, WELCOME_MESSAGE};
use crate::gateway::{CapabilityGateway, ImageSize, PendingUpload};
use crate::gemini::GeminiClient;
use crate::geo::{IpLocator, Locator};
use crate::util::env_first;

use self::input::InputLine;
use self::onboarding::Onboarding;
use self::profile::{AgentMode, AgentProfile};
use self::transcript::{MessageKind, Role, Transcript};
use self::turn::{TurnEvent, TurnParams};

// ── Application state ────────────────────────────────────────────────

/// Top-level session state.
///
/// Fields use `pub(crate)` visibility so that the sibling submodules
/// (`commands`, `ui`, `onboarding`, …) can access them directly while
/// keeping them hidden from the rest of the crate.
pub struct App {
    pub(crate) runtime: Runtime,
    pub(crate) gateway: Arc<dyn CapabilityGateway>,
    pub(crate) locator: Arc<dyn Locator>,
    pub(crate) api_key: Option<String>,
    pub(crate) profile: Option<AgentProfile>,
    pub(crate) onboarding: Onboarding,
    pub(crate) transcript: Transcript,
    pub(crate) mode: AgentMode,
    pub(crate) busy: bool,
    pub(crate) pending_upload: Option<PendingUpload>,
    pub(crate) queued: VecDeque<String>,
    pub(crate) speech_enabled: bool,
    pub(crate) image_dir: PathBuf,
    pub(crate) image_size: ImageSize,
    pub(crate) turn_tx: mpsc::UnboundedSender<TurnEvent>,
    pub(crate) turn_rx: mpsc::UnboundedReceiver<TurnEvent>,
    pub(crate) input: InputLine,
    pub(crate) scroll_offset: u16,
    pub(crate) should_quit: bool,
}

// ── Lifecycle ────────────────────────────────────────────────────────

impl App {
    /// Create and initialise a new application instance.
    pub fn new() -> Result<Self> {
        App::with_collaborators(Arc::new(GeminiClient::new()), Arc::new(IpLocator::new()))
    }

    /// Build an instance around explicit collaborators (tests swap in fakes).
    pub(crate) fn with_collaborators(
        gateway: Arc<dyn CapabilityGateway>,
        locator: Arc<dyn Locator>,
    ) -> Result<Self> {
        let runtime = Runtime::new().context("create tokio runtime")?;
        let (turn_tx, turn_rx) = mpsc::unbounded_channel();
        let api_key = env_first(&["AGENTFI_API_KEY", "GEMINI_API_KEY"]);
        let image_dir = env_first(&["AGENTFI_OUT"])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let image_size = env_first(&["AGENTFI_IMAGE_SIZE"])
            .and_then(|value| ImageSize::parse(&value))
            .unwrap_or_default();

        Ok(App {
            runtime,
            gateway,
            locator,
            api_key,
            profile: None,
            onboarding: Onboarding::default(),
            transcript: Transcript::new(),
            mode: AgentMode::Idle,
            busy: false,
            pending_upload: None,
            queued: VecDeque::new(),
            speech_enabled: true,
            image_dir,
            image_size,
            turn_tx,
            turn_rx,
            input: InputLine::default(),
            scroll_offset: 0,
            should_quit: false,
        })
    }

    /// Whether the user has requested to quit.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Flip the session into its deployed state: fix the profile, show the
    /// kernel banner, and warm the uplink with a handshake.
    pub(crate) fn deploy_profile(&mut self, name: String, personality_score: u8) {
        self.profile = Some(AgentProfile::deploy(name, personality_score));
        self.mode = AgentMode::Social;
        self.transcript
            .push(Role::System, WELCOME_MESSAGE, MessageKind::Text, None);
        if let Some(key) = self.api_key.clone() {
            turn::spawn_handshake(
                key,
                HANDSHAKE_PROMPT.to_string(),
                self.turn_tx.clone(),
                Arc::clone(&self.gateway),
                self.runtime.handle(),
            );
        }
    }
}

// ── Event handling ───────────────────────────────────────────────────

impl App {
    /// Route a terminal event to the appropriate handler.
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => self.handle_key(key)?,
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => self.scroll_up(3),
                MouseEventKind::ScrollDown => self.scroll_down(3),
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    /// Dispatch a key press to onboarding, input editing, or control actions.
    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if let KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            ..
        } = key
        {
            self.should_quit = true;
            return Ok(());
        }

        if self.profile.is_none() {
            self.handle_onboarding_key(key);
            return Ok(());
        }

        match key.code {
            KeyCode::Char(ch) => {
                self.scroll_offset = 0; // snap to bottom on new input
                self.input.insert(ch);
            }
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Up => self.input.history_prev(),
            KeyCode::Down => self.input.history_next(),
            KeyCode::PageUp => self.scroll_up(10),
            KeyCode::PageDown => self.scroll_down(10),
            KeyCode::Enter => {
                self.scroll_offset = 0; // snap to bottom on submit
                self.submit_input();
            }
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    /// Submit the current input line for processing.
    fn submit_input(&mut self) {
        let Some(line) = self.input.take() else {
            return;
        };

        // `/imagine` is an utterance, not a command: it belongs to the router.
        if line.starts_with('/') && !line.to_lowercase().starts_with("/imagine") {
            self.handle_command(&line);
        } else {
            self.submit(&line);
        }
    }
}

// ── Turn sequencing ──────────────────────────────────────────────────

impl App {
    /// Accept one utterance for processing.
    ///
    /// No-op until a profile is deployed. The raw utterance is appended to
    /// the transcript immediately; if a turn is already in flight the
    /// dispatch is queued so appends never interleave.
    pub(crate) fn submit(&mut self, utterance: &str) {
        if self.profile.as_ref().is_none_or(|p| !p.deployed) {
            return;
        }
        self.transcript
            .push(Role::User, utterance, MessageKind::Text, None);

        if self.busy {
            self.queued.push_back(utterance.to_string());
        } else {
            self.start_turn(utterance.to_string());
        }
    }

    /// Spawn the background turn for an utterance whose user message is
    /// already in the transcript.
    fn start_turn(&mut self, utterance: String) {
        let Some(profile) = self.profile.clone() else {
            return;
        };
        let Some(key) = self.api_key.clone() else {
            self.notice("API key not configured. Use /key <key> or set GEMINI_API_KEY.");
            return;
        };

        let params = TurnParams {
            key,
            utterance,
            profile,
            pending_upload: self.pending_upload.clone(),
            speech_enabled: self.speech_enabled,
            image_dir: self.image_dir.clone(),
            image_size: self.image_size,
        };

        self.busy = true;
        turn::spawn_turn(
            params,
            self.turn_tx.clone(),
            Arc::clone(&self.gateway),
            Arc::clone(&self.locator),
            self.runtime.handle(),
        );
    }

    /// Apply everything the background turns have produced since last tick.
    pub fn drain_turn_events(&mut self) {
        while let Ok(event) = self.turn_rx.try_recv() {
            self.apply_turn_event(event);
        }
    }

    fn apply_turn_event(&mut self, event: TurnEvent) {
        match event {
            TurnEvent::Mode(mode) => self.mode = mode,
            TurnEvent::Agent {
                body,
                kind,
                attachment,
            } => {
                self.transcript.push(Role::Agent, body, kind, attachment);
            }
            TurnEvent::System(body) => {
                self.notice(body);
            }
            TurnEvent::Completed { consumed_upload } => {
                if consumed_upload {
                    self.pending_upload = None;
                }
                self.busy = false;
                // Drain queued utterances; a dispatch that cannot start
                // (missing key) leaves busy false, so keep going.
                while !self.busy {
                    match self.queued.pop_front() {
                        Some(next) => self.start_turn(next),
                        None => break,
                    }
                }
            }
        }
    }

    /// Append a system-role notice to the transcript.
    pub(crate) fn notice(&mut self, body: impl Into<String>) {
        self.transcript
            .push(Role::System, body, MessageKind::Text, None);
    }
}

// ── Scrolling ────────────────────────────────────────────────────────

impl App {
    /// Scroll the transcript up by `n` lines.
    pub(crate) fn scroll_up(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(n);
    }

    /// Scroll the transcript down by `n` lines (towards the latest).
    pub(crate) fn scroll_down(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }
}

// ── Test support ─────────────────────────────────────────────────────

/// Inert collaborator fakes shared by the submodules' tests.
#[cfg(test)]
pub(crate) mod tests_support {
    use anyhow::Result;
    use async_trait::async_trait;

    use crate::gateway::{
        CapabilityGateway, Coordinates, GroundedReply, ImagePayload, ImageSize, PendingUpload,
    };
    use crate::geo::Locator;

    pub struct NoopGateway;

    #[async_trait]
    impl CapabilityGateway for NoopGateway {
        async fn generate_text(&self, _: &str, _: &str, _: &str) -> Result<String> {
            Ok(String::new())
        }
        async fn fast_response(&self, _: &str, _: &str) -> Result<String> {
            Ok(String::new())
        }
        async fn generate_with_search(&self, _: &str, _: &str) -> Result<GroundedReply> {
            Ok(GroundedReply::default())
        }
        async fn generate_with_location(
            &self,
            _: &str,
            _: &str,
            _: Option<Coordinates>,
        ) -> Result<GroundedReply> {
            Ok(GroundedReply::default())
        }
        async fn generate_image(
            &self,
            _: &str,
            _: &str,
            _: ImageSize,
        ) -> Result<Option<ImagePayload>> {
            Ok(None)
        }
        async fn edit_image(
            &self,
            _: &str,
            _: &PendingUpload,
            _: &str,
        ) -> Result<Option<ImagePayload>> {
            Ok(None)
        }
        async fn synthesize_speech(&self, _: &str, _: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    pub struct NoopLocator;

    #[async_trait]
    impl Locator for NoopLocator {
        async fn request_position(&self) -> Option<Coordinates> {
            None
        }
    }
}
