//! One conversation turn — the background task behind every `submit`.
//!
//! The TUI thread snapshots everything a turn needs into [`TurnParams`],
//! spawns the task on the shared runtime, and keeps drawing. The task
//! classifies the utterance, makes exactly one capability call, and pushes
//! [`TurnEvent`]s back over an [`mpsc`] channel. Every turn terminates with
//! exactly one `Completed` event; failures and empty results funnel through
//! the same exit as successes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::mpsc;

use crate::audio;
use crate::constants::{APP_NAME, GATEWAY_FAILURE_NOTICE, SPEECH_SNIPPET_CHARS};
use crate::gateway::{CapabilityGateway, GroundedReply, ImagePayload, ImageSize, PendingUpload};
use crate::geo::Locator;
use crate::util::{extension_for_mime, truncate_chars};

use super::profile::{AgentMode, AgentProfile};
use super::router::{Intent, classify};
use super::transcript::{Attachment, MessageKind};

// ── Public types ─────────────────────────────────────────────────────

/// Snapshot of session state a turn needs; everything is owned and `Send`.
#[derive(Clone)]
pub struct TurnParams {
    pub key: String,
    pub utterance: String,
    pub profile: AgentProfile,
    pub pending_upload: Option<PendingUpload>,
    pub speech_enabled: bool,
    pub image_dir: PathBuf,
    pub image_size: ImageSize,
}

/// A message from a background turn to the TUI.
pub enum TurnEvent {
    /// Cosmetic mode change for the header.
    Mode(AgentMode),
    /// An agent-role message to append.
    Agent {
        body: String,
        kind: MessageKind,
        attachment: Option<Attachment>,
    },
    /// A system-role notice to append.
    System(String),
    /// The turn settled; sent exactly once per spawned turn.
    Completed { consumed_upload: bool },
}

/// Spawn a background task for one turn.
pub fn spawn_turn(
    params: TurnParams,
    tx: mpsc::UnboundedSender<TurnEvent>,
    gateway: Arc<dyn CapabilityGateway>,
    locator: Arc<dyn Locator>,
    rt: &tokio::runtime::Handle,
) {
    rt.spawn(async move {
        let consumed_upload = run_turn(&params, &tx, &gateway, locator.as_ref()).await;
        let _ = tx.send(TurnEvent::Completed { consumed_upload });
    });
}

/// Fire the post-deploy handshake; its reply (if any) lands as an agent
/// message, and failure is swallowed.
pub fn spawn_handshake(
    key: String,
    prompt: String,
    tx: mpsc::UnboundedSender<TurnEvent>,
    gateway: Arc<dyn CapabilityGateway>,
    rt: &tokio::runtime::Handle,
) {
    rt.spawn(async move {
        if let Ok(ack) = gateway.fast_response(&key, &prompt).await {
            if !ack.trim().is_empty() {
                let _ = tx.send(TurnEvent::Agent {
                    body: ack,
                    kind: MessageKind::Text,
                    attachment: None,
                });
            }
        }
    });
}

// ── Turn body ────────────────────────────────────────────────────────

/// Run one turn to completion. Returns whether the pending upload was
/// consumed (true only after a successful edit).
async fn run_turn(
    params: &TurnParams,
    tx: &mpsc::UnboundedSender<TurnEvent>,
    gateway: &Arc<dyn CapabilityGateway>,
    locator: &dyn Locator,
) -> bool {
    match classify(&params.utterance, params.pending_upload.is_some()) {
        Intent::GenerateImage { prompt } => {
            let _ = tx.send(TurnEvent::Mode(AgentMode::Building));
            match gateway
                .generate_image(&params.key, &prompt, params.image_size)
                .await
            {
                Ok(Some(payload)) => {
                    send_image(tx, &params.image_dir, &payload, format!("Generated image for: {prompt}"));
                }
                Ok(None) => {
                    let _ = tx.send(TurnEvent::System("Failed to generate image.".to_string()));
                }
                Err(_) => {
                    let _ = tx.send(TurnEvent::System(GATEWAY_FAILURE_NOTICE.to_string()));
                }
            }
            let _ = tx.send(TurnEvent::Mode(AgentMode::Idle));
            false
        }

        Intent::EditImage { instruction } => {
            let Some(image) = params.pending_upload.as_ref() else {
                // classify only yields EditImage while an upload is buffered
                let _ = tx.send(TurnEvent::System("No image in buffer.".to_string()));
                return false;
            };
            let _ = tx.send(TurnEvent::Mode(AgentMode::Building));
            let consumed = match gateway.edit_image(&params.key, image, &instruction).await {
                Ok(Some(payload)) => {
                    send_image(tx, &params.image_dir, &payload, "Image edited.".to_string());
                    true
                }
                Ok(None) => {
                    let _ = tx.send(TurnEvent::System("Could not edit image.".to_string()));
                    false
                }
                Err(_) => {
                    let _ = tx.send(TurnEvent::System(GATEWAY_FAILURE_NOTICE.to_string()));
                    false
                }
            };
            let _ = tx.send(TurnEvent::Mode(AgentMode::Idle));
            consumed
        }

        Intent::Search { query } => {
            let _ = tx.send(TurnEvent::Mode(AgentMode::Trading));
            match gateway.generate_with_search(&params.key, &query).await {
                Ok(reply) => {
                    if params.speech_enabled {
                        speak_in_background(params, gateway, &reply.text);
                    }
                    send_grounded(tx, reply);
                }
                Err(_) => {
                    let _ = tx.send(TurnEvent::System(GATEWAY_FAILURE_NOTICE.to_string()));
                }
            }
            false
        }

        Intent::Locate { query } => {
            let _ = tx.send(TurnEvent::Mode(AgentMode::Social));
            // Best effort: a denied or failed lookup degrades to the
            // position-less variant of the same call.
            let position = locator.request_position().await;
            match gateway
                .generate_with_location(&params.key, &query, position)
                .await
            {
                Ok(reply) => send_grounded(tx, reply),
                Err(_) => {
                    let _ = tx.send(TurnEvent::System(GATEWAY_FAILURE_NOTICE.to_string()));
                }
            }
            false
        }

        Intent::Chat { prompt } => {
            let _ = tx.send(TurnEvent::Mode(params.profile.chat_mode()));
            let context = params.profile.system_context();
            match gateway.generate_text(&params.key, &prompt, &context).await {
                Ok(text) => {
                    let _ = tx.send(TurnEvent::Agent {
                        body: nonempty_or(text, "(no output)"),
                        kind: MessageKind::Text,
                        attachment: None,
                    });
                }
                Err(_) => {
                    let _ = tx.send(TurnEvent::System(GATEWAY_FAILURE_NOTICE.to_string()));
                }
            }
            false
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn nonempty_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

fn send_grounded(tx: &mpsc::UnboundedSender<TurnEvent>, reply: GroundedReply) {
    let attachment = if reply.citations.is_empty() {
        None
    } else {
        Some(Attachment::Citations(reply.citations))
    };
    let _ = tx.send(TurnEvent::Agent {
        body: nonempty_or(reply.text, "(no output)"),
        kind: MessageKind::Text,
        attachment,
    });
}

fn send_image(
    tx: &mpsc::UnboundedSender<TurnEvent>,
    dir: &Path,
    payload: &ImagePayload,
    body: String,
) {
    match save_image(dir, payload) {
        Ok(path) => {
            let _ = tx.send(TurnEvent::Agent {
                body,
                kind: MessageKind::Image,
                attachment: Some(Attachment::Image(path)),
            });
        }
        Err(err) => {
            let _ = tx.send(TurnEvent::System(format!("Failed to store image: {err:#}")));
        }
    }
}

/// Write image bytes under `dir` with a timestamped name.
fn save_image(dir: &Path, payload: &ImagePayload) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S%3f");
    let ext = extension_for_mime(&payload.mime_type);
    let path = dir.join(format!("{APP_NAME}-{stamp}.{ext}"));
    fs::create_dir_all(dir).with_context(|| format!("create output directory '{}'", dir.display()))?;
    fs::write(&path, &payload.data).with_context(|| format!("write image to '{}'", path.display()))?;
    Ok(path)
}

/// Speak the head of a grounded reply without extending the turn.
fn speak_in_background(params: &TurnParams, gateway: &Arc<dyn CapabilityGateway>, text: &str) {
    let snippet = truncate_chars(text, SPEECH_SNIPPET_CHARS).to_string();
    if snippet.trim().is_empty() {
        return;
    }
    let gateway = Arc::clone(gateway);
    let key = params.key.clone();
    tokio::spawn(async move {
        // Speech is a non-critical enhancement: both synthesis and playback
        // failures vanish here.
        if let Ok(pcm) = gateway.synthesize_speech(&key, &snippet).await {
            let _ = audio::play_pcm(&pcm);
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use crate::gateway::{Citation, Coordinates};

    use super::*;

    // ── Fake collaborators ───────────────────────────────────────────

    /// Gateway that records calls and replies per a fixed script.
    #[derive(Default)]
    struct ScriptedGateway {
        calls: Mutex<Vec<String>>,
        reject_all: bool,
        empty_images: bool,
    }

    impl ScriptedGateway {
        fn rejecting() -> Self {
            ScriptedGateway {
                reject_all: true,
                ..ScriptedGateway::default()
            }
        }

        fn empty() -> Self {
            ScriptedGateway {
                empty_images: true,
                ..ScriptedGateway::default()
            }
        }

        fn record(&self, name: &str) {
            self.calls.lock().unwrap().push(name.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn image_reply(&self) -> Result<Option<ImagePayload>> {
            if self.reject_all {
                return Err(anyhow!("link severed"));
            }
            if self.empty_images {
                return Ok(None);
            }
            Ok(Some(ImagePayload {
                mime_type: "image/png".to_string(),
                data: vec![1, 2, 3],
            }))
        }

        fn text_reply(&self, text: &str) -> Result<String> {
            if self.reject_all {
                return Err(anyhow!("link severed"));
            }
            if self.empty_images {
                return Ok(String::new());
            }
            Ok(text.to_string())
        }
    }

    #[async_trait]
    impl CapabilityGateway for ScriptedGateway {
        async fn generate_text(&self, _key: &str, _prompt: &str, _ctx: &str) -> Result<String> {
            self.record("generate_text");
            self.text_reply("thinking done")
        }

        async fn fast_response(&self, _key: &str, _prompt: &str) -> Result<String> {
            self.record("fast_response");
            self.text_reply("ACK.")
        }

        async fn generate_with_search(&self, _key: &str, _query: &str) -> Result<GroundedReply> {
            self.record("generate_with_search");
            self.text_reply("grounded").map(|text| GroundedReply {
                text,
                citations: vec![Citation {
                    title: "Example".to_string(),
                    uri: Some("https://example.com".to_string()),
                }],
            })
        }

        async fn generate_with_location(
            &self,
            _key: &str,
            _query: &str,
            position: Option<Coordinates>,
        ) -> Result<GroundedReply> {
            self.record(&format!(
                "generate_with_location:{}",
                if position.is_some() { "pos" } else { "none" }
            ));
            self.text_reply("nearby").map(|text| GroundedReply {
                text,
                citations: Vec::new(),
            })
        }

        async fn generate_image(
            &self,
            _key: &str,
            _prompt: &str,
            _size: ImageSize,
        ) -> Result<Option<ImagePayload>> {
            self.record("generate_image");
            self.image_reply()
        }

        async fn edit_image(
            &self,
            _key: &str,
            _image: &PendingUpload,
            _instruction: &str,
        ) -> Result<Option<ImagePayload>> {
            self.record("edit_image");
            self.image_reply()
        }

        async fn synthesize_speech(&self, _key: &str, _text: &str) -> Result<Vec<u8>> {
            self.record("synthesize_speech");
            if self.reject_all {
                return Err(anyhow!("link severed"));
            }
            Ok(vec![0, 0, 0, 0])
        }
    }

    struct NoLocator;

    #[async_trait]
    impl Locator for NoLocator {
        async fn request_position(&self) -> Option<Coordinates> {
            None
        }
    }

    struct FixedLocator;

    #[async_trait]
    impl Locator for FixedLocator {
        async fn request_position(&self) -> Option<Coordinates> {
            Some(Coordinates {
                lat: 35.6,
                lng: 139.7,
            })
        }
    }

    // ── Harness ──────────────────────────────────────────────────────

    fn params(utterance: &str, upload: Option<PendingUpload>) -> TurnParams {
        TurnParams {
            key: "test-key".to_string(),
            utterance: utterance.to_string(),
            profile: AgentProfile::deploy("OMEGA-7", 80),
            pending_upload: upload,
            speech_enabled: false,
            image_dir: std::env::temp_dir(),
            image_size: ImageSize::default(),
        }
    }

    fn upload() -> PendingUpload {
        PendingUpload {
            name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            data: vec![9, 9, 9],
        }
    }

    /// Run a turn through `spawn_turn` and collect events until `Completed`.
    async fn collect(
        gateway: Arc<ScriptedGateway>,
        locator: Arc<dyn Locator>,
        p: TurnParams,
    ) -> (Vec<TurnEvent>, bool) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_turn(p, tx, gateway, locator, &tokio::runtime::Handle::current());

        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
                .await
                .expect("turn must settle")
                .expect("channel open");
            if let TurnEvent::Completed { consumed_upload } = event {
                // The sender side is dropped with the task; any further
                // recv would yield None, proving exactly one Completed.
                assert!(rx.recv().await.is_none());
                return (events, consumed_upload);
            }
            events.push(event);
        }
    }

    fn system_bodies(events: &[TurnEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                TurnEvent::System(body) => Some(body.as_str()),
                _ => None,
            })
            .collect()
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn rejecting_gateway_still_settles_with_one_system_notice() {
        let gateway = Arc::new(ScriptedGateway::rejecting());
        let (events, consumed) =
            collect(gateway, Arc::new(NoLocator), params("hello", None)).await;

        assert!(!consumed);
        assert_eq!(system_bodies(&events), vec![GATEWAY_FAILURE_NOTICE]);
    }

    #[tokio::test]
    async fn empty_image_result_yields_the_softer_notice() {
        let gateway = Arc::new(ScriptedGateway::empty());
        let (events, consumed) =
            collect(gateway, Arc::new(NoLocator), params("/imagine a cat", None)).await;

        assert!(!consumed);
        assert_eq!(system_bodies(&events), vec!["Failed to generate image."]);
    }

    #[tokio::test]
    async fn successful_edit_consumes_the_upload() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (events, consumed) = collect(
            Arc::clone(&gateway),
            Arc::new(NoLocator),
            params("remove the background", Some(upload())),
        )
        .await;

        assert!(consumed);
        assert_eq!(gateway.calls(), vec!["edit_image"]);
        assert!(events.iter().any(|event| matches!(
            event,
            TurnEvent::Agent {
                kind: MessageKind::Image,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn failed_edit_leaves_the_upload_buffered() {
        let gateway = Arc::new(ScriptedGateway::empty());
        let (events, consumed) = collect(
            gateway,
            Arc::new(NoLocator),
            params("remove the background", Some(upload())),
        )
        .await;

        assert!(!consumed);
        assert_eq!(system_bodies(&events), vec!["Could not edit image."]);
    }

    #[tokio::test]
    async fn edit_without_upload_falls_through_to_chat() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (_, consumed) = collect(
            Arc::clone(&gateway),
            Arc::new(NoLocator),
            params("edit this photo", None),
        )
        .await;

        assert!(!consumed);
        assert_eq!(gateway.calls(), vec!["generate_text"]);
    }

    #[tokio::test]
    async fn location_turn_degrades_without_a_position() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (_, _) = collect(
            Arc::clone(&gateway),
            Arc::new(NoLocator),
            params("where is the best sushi", None),
        )
        .await;
        assert_eq!(gateway.calls(), vec!["generate_with_location:none"]);

        let gateway = Arc::new(ScriptedGateway::default());
        let (_, _) = collect(
            Arc::clone(&gateway),
            Arc::new(FixedLocator),
            params("where is the best sushi", None),
        )
        .await;
        assert_eq!(gateway.calls(), vec!["generate_with_location:pos"]);
    }

    #[tokio::test]
    async fn search_turn_attaches_citations() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (events, _) = collect(
            gateway,
            Arc::new(NoLocator),
            params("price of BTC", None),
        )
        .await;

        assert!(events.iter().any(|event| matches!(
            event,
            TurnEvent::Agent {
                attachment: Some(Attachment::Citations(_)),
                ..
            }
        )));
    }

    #[tokio::test]
    async fn image_turn_passes_through_building_back_to_idle() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (events, _) = collect(
            gateway,
            Arc::new(NoLocator),
            params("/imagine a cat", None),
        )
        .await;

        let modes: Vec<AgentMode> = events
            .iter()
            .filter_map(|event| match event {
                TurnEvent::Mode(mode) => Some(*mode),
                _ => None,
            })
            .collect();
        assert_eq!(modes, vec![AgentMode::Building, AgentMode::Idle]);
    }
}
