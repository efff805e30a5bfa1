//! Slash-command dispatch and handler implementations.
//!
//! Every `/command` typed by the user is routed through
//! [`App::handle_command`]. The one exception is `/imagine`, which is an
//! utterance for the intent router, not a command — `submit_input` never
//! sends it here.

use std::fs;
use std::path::Path;

use url::Url;

use crate::constants::APP_VERSION;
use crate::gateway::PendingUpload;
use crate::util::{mask_key, mime_for_extension};

use super::App;

// ── Command dispatch ─────────────────────────────────────────────────

impl App {
    /// Route a slash-command to the matching handler.
    pub(crate) fn handle_command(&mut self, line: &str) {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "/help" => self.show_help(),
            "/quit" | "/exit" => self.should_quit = true,
            "/status" => self.show_status(),
            "/upload" => self.handle_upload_command(parts.collect()),
            "/key" => self.handle_key_command(parts.collect()),
            "/voice" => self.handle_voice_command(parts.collect()),
            "/open" => self.handle_open_command(parts.collect()),
            _ => self.notice(format!("Unknown command: {cmd}. Type /help.")),
        }
    }
}

// ── Help ─────────────────────────────────────────────────────────────

impl App {
    fn show_help(&mut self) {
        let lines = [
            "Commands:",
            "(no slash)             Talk to your agent",
            "/imagine <prompt>      Generate an image",
            "/upload <path>         Buffer an image for editing",
            "/open <n>              Open source n of the last grounded reply",
            "/voice [on|off]        Toggle spoken replies for search results",
            "/key <key>             Set the Gemini API key for this session",
            "/status                Show agent identity and session state",
            "/quit                  Exit",
            "",
            "Try: \"Where is the best sushi nearby?\" (maps)",
            "     \"Price of BTC\" (search)",
            "     \"/imagine a cyberpunk city\" (image)",
        ];
        self.notice(lines.join("\n"));
    }

    fn show_status(&mut self) {
        let identity = match &self.profile {
            Some(profile) => format!(
                "{} ({}/100 {})",
                profile.name,
                profile.personality_score,
                profile.context_label()
            ),
            None => "not deployed".to_string(),
        };
        let buffer = match &self.pending_upload {
            Some(upload) => upload.name.clone(),
            None => "empty".to_string(),
        };
        let key = match &self.api_key {
            Some(key) => mask_key(key),
            None => "unset".to_string(),
        };
        let voice = if self.speech_enabled { "on" } else { "off" };

        self.notice(format!(
            "AGENTFI v{APP_VERSION}\nIDENTITY: {identity}\nMODE: {mode}\nBUFFER: {buffer}\n\
             KEY: {key}\nVOICE: {voice}\nLOG: {log} message(s)",
            mode = self.mode.label(),
            log = self.transcript.len(),
        ));
    }
}

// ── /upload ──────────────────────────────────────────────────────────

impl App {
    /// Load an image file into the single-slot edit buffer, replacing any
    /// previously buffered one.
    fn handle_upload_command(&mut self, args: Vec<&str>) {
        if args.is_empty() {
            self.notice("Usage: /upload <path>");
            return;
        }
        let raw_path = args.join(" ");
        let path = Path::new(&raw_path);

        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                self.notice(format!("Could not read '{raw_path}': {err}"));
                return;
            }
        };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(mime_for_extension)
            .unwrap_or("image/png")
            .to_string();

        self.pending_upload = Some(PendingUpload {
            name: name.clone(),
            mime_type,
            data,
        });
        self.notice(format!(
            "Image loaded into buffer: {name}. Type an instruction to edit."
        ));
    }
}

// ── /key ─────────────────────────────────────────────────────────────

impl App {
    fn handle_key_command(&mut self, args: Vec<&str>) {
        match args.first() {
            Some(key) => {
                self.api_key = Some((*key).to_string());
                self.notice(format!("API key set ({}).", mask_key(key)));
            }
            None => match &self.api_key {
                Some(key) => {
                    let masked = mask_key(key);
                    self.notice(format!("API key set ({masked})."));
                }
                None => self.notice("API key not set. Usage: /key <key>"),
            },
        }
    }
}

// ── /voice ───────────────────────────────────────────────────────────

impl App {
    fn handle_voice_command(&mut self, args: Vec<&str>) {
        match args.first() {
            Some(&"on") => self.speech_enabled = true,
            Some(&"off") => self.speech_enabled = false,
            Some(other) => {
                let other = other.to_string();
                self.notice(format!("Usage: /voice on|off (got '{other}')"));
                return;
            }
            None => self.speech_enabled = !self.speech_enabled,
        }
        let state = if self.speech_enabled { "on" } else { "off" };
        self.notice(format!("Voice {state}."));
    }
}

// ── /open ────────────────────────────────────────────────────────────

impl App {
    /// Open the n-th cited source of the most recent grounded reply.
    fn handle_open_command(&mut self, args: Vec<&str>) {
        let index = match args.first().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n >= 1 => n - 1,
            _ => {
                self.notice("Usage: /open <n> (1-based source index)");
                return;
            }
        };

        let uri = match self.transcript.latest_citations() {
            Some(citations) => match citations.get(index) {
                Some(citation) => citation.uri.clone(),
                None => {
                    self.notice(format!(
                        "No source [{}] — the last reply cited {} source(s).",
                        index + 1,
                        citations.len()
                    ));
                    return;
                }
            },
            None => {
                self.notice("No grounded reply to open sources from.");
                return;
            }
        };

        let Some(uri) = uri else {
            self.notice("That source has no link.");
            return;
        };
        if Url::parse(&uri).is_err() {
            self.notice(format!("Source link is not a valid URL: {uri}"));
            return;
        }
        match open::that(&uri) {
            Ok(()) => self.notice(format!("Opened {uri}")),
            Err(err) => self.notice(format!("Could not open {uri}: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::app::transcript::Role;

    use super::super::tests_support::{NoopGateway, NoopLocator};
    use super::*;

    fn app() -> App {
        let mut app =
            App::with_collaborators(Arc::new(NoopGateway), Arc::new(NoopLocator)).expect("app");
        app.api_key = None;
        app
    }

    #[test]
    fn unknown_commands_point_at_help() {
        let mut app = app();
        app.handle_command("/frobnicate now");
        assert!(
            app.transcript
                .entries()
                .iter()
                .any(|m| m.role == Role::System && m.body.contains("Unknown command: /frobnicate"))
        );
    }

    #[test]
    fn key_command_sets_and_masks_the_key() {
        let mut app = app();
        app.handle_command("/key AIzaSyExampleExample1234");
        assert_eq!(app.api_key.as_deref(), Some("AIzaSyExampleExample1234"));
        let last = app.transcript.entries().last().expect("notice");
        assert!(last.body.contains("AIza…1234"));
        assert!(!last.body.contains("ExampleExample"));
    }

    #[test]
    fn voice_command_toggles_without_args() {
        let mut app = app();
        assert!(app.speech_enabled);
        app.handle_command("/voice");
        assert!(!app.speech_enabled);
        app.handle_command("/voice on");
        assert!(app.speech_enabled);
    }

    #[test]
    fn upload_replaces_the_previous_buffer() {
        let mut app = app();
        let dir = std::env::temp_dir();
        let first = dir.join("agentfi-test-first.png");
        let second = dir.join("agentfi-test-second.jpg");
        std::fs::write(&first, [1u8, 2]).unwrap();
        std::fs::write(&second, [3u8, 4]).unwrap();

        app.handle_command(&format!("/upload {}", first.display()));
        assert_eq!(
            app.pending_upload.as_ref().map(|u| u.name.as_str()),
            Some("agentfi-test-first.png")
        );

        app.handle_command(&format!("/upload {}", second.display()));
        let upload = app.pending_upload.as_ref().expect("buffer");
        assert_eq!(upload.name, "agentfi-test-second.jpg");
        assert_eq!(upload.mime_type, "image/jpeg");
        assert_eq!(upload.data, vec![3, 4]);
    }

    #[test]
    fn upload_failure_leaves_the_buffer_untouched() {
        let mut app = app();
        app.handle_command("/upload /definitely/not/a/file.png");
        assert!(app.pending_upload.is_none());
    }

    #[test]
    fn open_without_grounded_reply_explains_itself() {
        let mut app = app();
        app.handle_command("/open 1");
        let last = app.transcript.entries().last().expect("notice");
        assert!(last.body.contains("No grounded reply"));
    }
}
