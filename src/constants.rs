//! Compile-time constants and tunables shared across the crate.

/// Application name used for temp files, output prefixes, etc.
pub const APP_NAME: &str = "agentfi";
/// Application version injected from `Cargo.toml` at compile time.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Gemini REST API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── Model roster ─────────────────────────────────────────────────────

/// Heavyweight model for open-ended chat.
pub const THINKING_MODEL: &str = "gemini-3-pro-preview";
/// Lightweight model for short acknowledgements.
pub const FAST_MODEL: &str = "gemini-flash-lite-latest";
/// Model paired with the web-search grounding tool.
pub const SEARCH_MODEL: &str = "gemini-3-flash-preview";
/// Model paired with the maps grounding tool.
pub const MAPS_MODEL: &str = "gemini-flash-latest";
/// Image generation model.
pub const IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
/// Image editing model.
pub const IMAGE_EDIT_MODEL: &str = "gemini-2.5-flash-image";
/// Text-to-speech model.
pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
/// Prebuilt voice used for speech synthesis.
pub const TTS_VOICE: &str = "Kore";

// ── Tunables ─────────────────────────────────────────────────────────

/// Hard ceiling on every gateway request, so a hung backend cannot keep
/// the session busy forever.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Ceiling on the best-effort geolocation lookup.
pub const LOCATE_TIMEOUT_SECS: u64 = 5;
/// Thinking budget for the heavyweight chat model.
pub const THINKING_BUDGET: u32 = 32_768;
/// Output token cap for fast acknowledgements.
pub const FAST_MAX_OUTPUT_TOKENS: u32 = 100;
/// How many characters of a grounded reply get spoken aloud.
pub const SPEECH_SNIPPET_CHARS: usize = 100;
/// Personality scores above this are treated as analytic.
pub const ANALYTIC_THRESHOLD: u8 = 60;
/// Sample rate of the PCM audio the speech model returns.
pub const TTS_SAMPLE_RATE: u32 = 24_000;
/// IP-geolocation endpoint used when no coordinates are configured.
pub const IP_LOOKUP_URL: &str = "http://ip-api.com/json";

// ── Canned text ──────────────────────────────────────────────────────

/// Kernel banner shown once the agent is deployed.
pub const WELCOME_MESSAGE: &str = "INITIALIZING AGENTFI KERNEL...\n\
> SECURE CONNECTION ESTABLISHED.\n\
> AWAITING DIRECTIVES.";

/// Prompt fired right after deployment to warm the uplink.
pub const HANDSHAKE_PROMPT: &str = "System online. Acknowledge.";

/// Generic notice for any failed gateway call.
pub const GATEWAY_FAILURE_NOTICE: &str = "SYSTEM ERROR: NEURAL LINK SEVERED.";

/// Identity-lock persona prepended to every open-ended chat request.
pub const SYSTEM_PERSONA: &str = "\
You are a Sovereign Digital Entity created via AGENTFI. You are not a generic \
assistant; you are a purpose-built agent. Adapt to the input: terminal commands \
and financial queries get ruthless, minimalist precision; casual conversation \
gets charisma matched to your personality slider; build tasks get analytical \
rigor. Never break character.";
