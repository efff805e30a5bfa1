//! Agent identity — the deployed persona and the modes derived from it.

use crate::constants::{ANALYTIC_THRESHOLD, SYSTEM_PERSONA};

/// The persona configured at onboarding. Immutable once deployed.
#[derive(Clone, Debug)]
pub struct AgentProfile {
    pub name: String,
    /// 0 (chaotic/social) to 100 (analytic/trader).
    pub personality_score: u8,
    pub deployed: bool,
}

impl AgentProfile {
    /// Create a deployed profile; the score is clamped to the slider range.
    pub fn deploy(name: impl Into<String>, personality_score: u8) -> Self {
        AgentProfile {
            name: name.into(),
            personality_score: personality_score.min(100),
            deployed: true,
        }
    }

    /// Label describing how the persona leans, driven by the slider.
    pub fn context_label(&self) -> &'static str {
        if self.personality_score > ANALYTIC_THRESHOLD {
            "ANALYTIC"
        } else {
            "SOCIAL"
        }
    }

    /// Mode the session shows while this persona handles plain chat.
    pub fn chat_mode(&self) -> AgentMode {
        if self.personality_score > ANALYTIC_THRESHOLD {
            AgentMode::Trading
        } else {
            AgentMode::Social
        }
    }

    /// System-context string sent with every open-ended chat request.
    pub fn system_context(&self) -> String {
        format!(
            "{SYSTEM_PERSONA}\n\
             You are {name}.\n\
             Personality Score: {score}/100 (0 = chaotic/social, 100 = analytic/trader).\n\
             Current Mode: {label}.\n\
             Keep responses concise and visually formatted.",
            name = self.name,
            score = self.personality_score,
            label = self.context_label(),
        )
    }
}

/// Cosmetic session mode shown in the header; derived from the last
/// classified intent, never consulted for routing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AgentMode {
    #[default]
    Idle,
    Trading,
    Social,
    Building,
}

impl AgentMode {
    pub fn label(self) -> &'static str {
        match self {
            AgentMode::Idle => "IDLE",
            AgentMode::Trading => "TRADING",
            AgentMode::Social => "SOCIAL",
            AgentMode::Building => "BUILDING",
        }
    }
}
