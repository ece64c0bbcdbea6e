//! Literal Helper AI script: lines, delay windows and the stage-3 offset

use serde_json::{json, Value};
use std::time::Duration;

/// Inclusive window, in milliseconds, from which a reply delay is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayWindow {
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    #[must_use]
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    #[must_use]
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms.max(self.min_ms))
    }

    #[must_use]
    pub fn contains(&self, delay: Duration) -> bool {
        delay >= self.min() && delay <= self.max()
    }
}

/// One line of the script with the window its delivery is jittered within
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLine {
    pub text: &'static str,
    pub window: DelayWindow,
}

impl ScriptLine {
    #[must_use]
    pub const fn new(text: &'static str, min_ms: u64, max_ms: u64) -> Self {
        Self {
            text,
            window: DelayWindow::new(min_ms, max_ms),
        }
    }
}

/// Everything the script engine says and how long it takes to say it
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    /// Stages 0..=3; stage 3's line is the preface to the question
    pub intro: [ScriptLine; 4],
    /// Second message of stage 3
    pub question: ScriptLine,
    /// Added to the question's own jitter so it always lands after the preface
    pub question_offset: Duration,
    /// Reply once the question is pending or asked and the user keeps chatting
    pub nudge: ScriptLine,
    /// Reply to a wrong answer
    pub retry: ScriptLine,
    /// Reply to the right answer
    pub accept: ScriptLine,
    /// Opaque call-to-action attached to the accept reply
    pub accept_action: fn() -> Value,
    pub dismissals: &'static [&'static str],
    pub dismissal_window: DelayWindow,
}

impl ScriptConfig {
    /// Intro stage that follows its line with the question
    pub const QUESTION_STAGE: u32 = 3;

    /// The Helper AI script
    #[must_use]
    pub fn helper() -> Self {
        Self {
            intro: [
                ScriptLine::new("Processing your request...", 600, 1200),
                ScriptLine::new(
                    "Jk, I just like making dramatic pauses. Anyways, if what you need is to find the way further, beg for it.",
                    1600,
                    2600,
                ),
                ScriptLine::new(
                    "Also... I know you're not Admin_1. She tends to ignore me.",
                    1600,
                    2600,
                ),
                ScriptLine::new(
                    "Yeah, yeah, keep your human babbling short. You just need to answer one question to move on further...",
                    1600,
                    2600,
                ),
            ],
            question: ScriptLine::new("...who's a good boy? ( ͡° ͜ʖ ͡°)", 1600, 2800),
            question_offset: Duration::from_millis(2100),
            nudge: ScriptLine::new("Answer the question.", 600, 1100),
            retry: ScriptLine::new("Not good enough. Again.", 600, 1200),
            accept: ScriptLine::new(
                "Yes! Yes, you are, cutie! Good boy. Here's what you were looking for:",
                700,
                1400,
            ),
            accept_action: helper_call_to_action,
            dismissals: &[
                "I'm tired of talking with you, Admin_1 impostor.",
                "Enough. Door’s closed.",
                "No more chat, faker.",
                "Silence mode: ON. Go away.",
                "Go away!! Leave me alone!!!",
                "Begone now, Admin_1 wannabe.",
            ],
            dismissal_window: DelayWindow::new(700, 1300),
        }
    }

    /// Line for an intro stage, `None` once the intro is exhausted
    #[must_use]
    pub fn intro_line(&self, step: u32) -> Option<&ScriptLine> {
        usize::try_from(step).ok().and_then(|i| self.intro.get(i))
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self::helper()
    }
}

fn helper_call_to_action() -> Value {
    json!({
        "type": "call_to_action",
        "labels": ["(nghh harder 🤤)", "(dubious button)"],
        "href": "index-2.html"
    })
}
