//! Pure state transition function
//!
//! Given the same state, event and jitter draws, the same result comes out.
//! Nothing here touches timers or the transcript.

use super::effect::Reply;
use super::jitter::Jitter;
use super::matcher::matches_good_boy_answer;
use super::script::{ScriptConfig, ScriptLine};
use super::state::{ConversationState, StateUpdate};
use super::{Effect, Event};
use std::time::Duration;

/// Result of a state transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Scheduled replies, in scheduling order
    #[must_use]
    pub fn replies(&self) -> impl Iterator<Item = (Duration, &Reply)> {
        self.effects.iter().filter_map(Effect::as_reply)
    }
}

/// Run one user submission through the script.
///
/// Callers trim and drop empty input first, but an empty string is still
/// handled: it is never a correct answer and otherwise advances the intro
/// like any other text.
#[must_use]
pub fn submit(
    state: &ConversationState,
    script: &ScriptConfig,
    text: &str,
    jitter: &mut dyn Jitter,
) -> TransitionResult {
    transition(state, script, Event::user_message(text), jitter)
}

/// Pure transition function
#[must_use]
pub fn transition(
    state: &ConversationState,
    script: &ScriptConfig,
    event: Event,
    jitter: &mut dyn Jitter,
) -> TransitionResult {
    match event {
        Event::UserMessage { text } => on_user_message(*state, script, &text, jitter),
        Event::ReplyDelivered { on_delivery } => on_reply_delivered(*state, on_delivery),
    }
}

fn on_user_message(
    state: ConversationState,
    script: &ScriptConfig,
    text: &str,
    jitter: &mut dyn Jitter,
) -> TransitionResult {
    // Solved: dismiss forever
    if state.solved {
        let line = script
            .dismissals
            .get(jitter.pick(script.dismissals.len()))
            .copied()
            .unwrap_or(script.nudge.text);
        let delay = jitter.delay_in(script.dismissal_window);
        return TransitionResult::new(state)
            .with_effect(Effect::schedule_reply(delay, Reply::text(line)));
    }

    // Question is open
    if state.awaiting_answer {
        if matches_good_boy_answer(text) {
            let reply = Reply::text(script.accept.text).with_display_data((script.accept_action)());
            let solved = ConversationState {
                awaiting_answer: false,
                solved: true,
                ..state
            };
            return TransitionResult::new(solved)
                .with_effect(scheduled(&script.accept, reply, Duration::ZERO, jitter))
                .with_effect(Effect::NotifyState);
        }

        return TransitionResult::new(state).with_effect(line_effect(&script.retry, jitter));
    }

    // Intro script
    match script.intro_line(state.step) {
        Some(line) if state.step == ScriptConfig::QUESTION_STAGE => {
            let preface = line_effect(line, jitter);
            let question = scheduled(
                &script.question,
                Reply::text(script.question.text).on_delivery(StateUpdate::AwaitAnswer),
                script.question_offset,
                jitter,
            );
            TransitionResult::new(advanced(state))
                .with_effect(preface)
                .with_effect(question)
                .with_effect(Effect::NotifyState)
        }
        Some(line) => TransitionResult::new(advanced(state))
            .with_effect(line_effect(line, jitter))
            .with_effect(Effect::NotifyState),
        None => TransitionResult::new(state).with_effect(line_effect(&script.nudge, jitter)),
    }
}

fn on_reply_delivered(
    state: ConversationState,
    on_delivery: Option<StateUpdate>,
) -> TransitionResult {
    match on_delivery.map(|update| state.with_update(update)) {
        Some(updated) if updated != state => {
            TransitionResult::new(updated).with_effect(Effect::NotifyState)
        }
        _ => TransitionResult::new(state),
    }
}

fn advanced(state: ConversationState) -> ConversationState {
    ConversationState {
        step: state.step.saturating_add(1),
        ..state
    }
}

fn line_effect(line: &ScriptLine, jitter: &mut dyn Jitter) -> Effect {
    scheduled(line, Reply::text(line.text), Duration::ZERO, jitter)
}

fn scheduled(line: &ScriptLine, reply: Reply, offset: Duration, jitter: &mut dyn Jitter) -> Effect {
    Effect::schedule_reply(offset + jitter.delay_in(line.window), reply)
}
