//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::QUESTION_STEP;
use super::*;
use proptest::prelude::*;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn script() -> ScriptConfig {
    ScriptConfig::helper()
}

/// Every window a reply could legitimately have been drawn from
fn reply_fits_some_window(script: &ScriptConfig, delay: Duration, reply: &Reply) -> bool {
    if reply.on_delivery == Some(StateUpdate::AwaitAnswer) {
        return delay >= script.question_offset
            && script.question.window.contains(delay - script.question_offset);
    }
    let lines = script
        .intro
        .iter()
        .chain([&script.nudge, &script.retry, &script.accept]);
    for line in lines {
        if line.text == reply.text && line.window.contains(delay) {
            return true;
        }
    }
    script.dismissals.contains(&reply.text.as_str()) && script.dismissal_window.contains(delay)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_matching_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("me".to_string()),
        "me{1,5}!?".prop_map(String::from),
        Just("I am".to_string()),
        Just("i'm the one".to_string()),
        Just("IM HIM".to_string()),
        Just("it's me".to_string()),
        "[a-z ]{0,10}good boy[a-z ]{0,10}".prop_map(String::from),
        "me [a-z]{1,10}".prop_map(String::from),
    ]
}

fn arb_non_matching_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("you".to_string()),
        Just("no".to_string()),
        Just(String::new()),
        Just("meh".to_string()),
        "[x-z]{1,12}".prop_map(String::from),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![arb_matching_text(), arb_non_matching_text()]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => arb_text().prop_map(|text| Event::UserMessage { text }),
        1 => Just(Event::ReplyDelivered { on_delivery: Some(StateUpdate::AwaitAnswer) }),
        1 => Just(Event::ReplyDelivered { on_delivery: None }),
    ]
}

fn arb_state() -> impl Strategy<Value = ConversationState> {
    prop_oneof![
        (0u32..8).prop_map(|step| ConversationState {
            step,
            ..ConversationState::default()
        }),
        Just(ConversationState {
            step: QUESTION_STEP,
            awaiting_answer: true,
            solved: false,
        }),
        Just(ConversationState {
            step: QUESTION_STEP,
            awaiting_answer: false,
            solved: true,
        }),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: valid state after any sequence of events
    #[test]
    fn prop_transitions_preserve_validity(
        events in proptest::collection::vec(arb_event(), 0..30),
        seed in any::<u64>()
    ) {
        let script = script();
        let mut jitter = RandomJitter::seeded(seed);
        let mut state = ConversationState::new();

        for event in events {
            let before = state;
            let result = transition(&state, &script, event, &mut jitter);
            state = result.new_state;

            prop_assert!(state.is_consistent(), "Invalid state: {:?}", state);
            prop_assert!(state.step >= before.step, "Step went backwards: {:?} -> {:?}", before, state);
            prop_assert!(state.step <= QUESTION_STEP, "Step overshot: {:?}", state);
            prop_assert!(!before.solved || state.solved, "Solved reverted: {:?}", state);
        }
    }

    // Invariant 2: solved conversations only ever dismiss
    #[test]
    fn prop_solved_is_terminal(texts in proptest::collection::vec(arb_text(), 1..10), seed in any::<u64>()) {
        let script = script();
        let mut jitter = RandomJitter::seeded(seed);
        let solved = ConversationState {
            step: QUESTION_STEP,
            awaiting_answer: false,
            solved: true,
        };

        for text in texts {
            let result = submit(&solved, &script, &text, &mut jitter);
            prop_assert_eq!(result.new_state, solved);
            prop_assert_eq!(result.effects.len(), 1);
            let (_, reply) = result.replies().next().expect("one reply");
            prop_assert!(script.dismissals.contains(&reply.text.as_str()));
        }
    }

    // Invariant 3: every delay comes from the window of the line it carries
    #[test]
    fn prop_delays_respect_windows(state in arb_state(), text in arb_text(), seed in any::<u64>()) {
        let script = script();
        let mut jitter = RandomJitter::seeded(seed);

        let result = submit(&state, &script, &text, &mut jitter);
        for (delay, reply) in result.replies() {
            prop_assert!(
                reply_fits_some_window(&script, delay, reply),
                "Delay {:?} out of window for {:?}",
                delay,
                reply.text
            );
        }
    }

    // Invariant 4: a wrong answer never moves the conversation
    #[test]
    fn prop_wrong_answer_keeps_waiting(text in arb_non_matching_text(), seed in any::<u64>()) {
        let script = script();
        let mut jitter = RandomJitter::seeded(seed);
        let awaiting = ConversationState {
            step: QUESTION_STEP,
            awaiting_answer: true,
            solved: false,
        };

        let result = submit(&awaiting, &script, &text, &mut jitter);
        prop_assert_eq!(result.new_state, awaiting);
        prop_assert_eq!(result.replies().count(), 1);
    }

    // Invariant 5: a right answer solves with exactly one reply and one notification
    #[test]
    fn prop_right_answer_solves(text in arb_matching_text(), seed in any::<u64>()) {
        let script = script();
        let mut jitter = RandomJitter::seeded(seed);
        let awaiting = ConversationState {
            step: QUESTION_STEP,
            awaiting_answer: true,
            solved: false,
        };

        let result = submit(&awaiting, &script, &text, &mut jitter);
        prop_assert!(result.new_state.solved);
        prop_assert!(!result.new_state.awaiting_answer);
        prop_assert_eq!(result.effects.len(), 2);
        prop_assert_eq!(result.replies().count(), 1);
        prop_assert!(result.effects.contains(&Effect::NotifyState));
    }

    // Invariant 6: the matcher ignores case and surrounding whitespace
    #[test]
    fn prop_matcher_normalizes(text in "[a-zA-Z' !]{0,20}", pad in " {0,3}") {
        let padded = format!("{pad}{}{pad}", text.to_uppercase());
        prop_assert_eq!(matches_good_boy_answer(&text), matches_good_boy_answer(&padded));
    }

    // Invariant 7: the matcher is only consulted once the question is open
    #[test]
    fn prop_intro_ignores_answers(step in 0u32..4, text in arb_matching_text(), seed in any::<u64>()) {
        let script = script();
        let mut jitter = RandomJitter::seeded(seed);
        let state = ConversationState {
            step,
            ..ConversationState::default()
        };

        let result = submit(&state, &script, &text, &mut jitter);
        prop_assert_eq!(result.new_state.step, step + 1);
        prop_assert!(!result.new_state.solved);
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_four_submissions_reach_question() {
    let script = script();
    let mut jitter = FixedJitter::new();
    let mut state = ConversationState::new();

    for text in ["hi", "hello", "anyone?"] {
        state = submit(&state, &script, text, &mut jitter).new_state;
    }
    let fourth = submit(&state, &script, "please", &mut jitter);
    let pending: Vec<Reply> = fourth.replies().map(|(_, r)| r.clone()).collect();
    state = fourth.new_state;
    assert_eq!(state.step, 4);
    assert!(!state.awaiting_answer);

    // A fifth submission before the question lands changes nothing
    let early = submit(&state, &script, "hurry up", &mut jitter);
    assert_eq!(early.new_state, state);

    // Deliver the fourth submission's replies in order
    for reply in pending {
        state = transition(
            &state,
            &script,
            Event::ReplyDelivered {
                on_delivery: reply.on_delivery,
            },
            &mut jitter,
        )
        .new_state;
    }
    assert!(state.awaiting_answer);

    let wrong = submit(&state, &script, "no", &mut jitter);
    assert_eq!(wrong.new_state, state);

    let right = submit(&state, &script, "it's me", &mut jitter);
    assert!(right.new_state.solved);
    assert!(!right.new_state.awaiting_answer);
}
