//! The Bridge's conversation state machine (spec §4.1), kept pure and
//! separate from socket I/O so it can be unit-tested without a live
//! telephony or LLM connection — the state machine branches on the tag,
//! the Bridge interprets the side effects against real sockets.

use voice_domain::call::ConversationState;

/// Inputs the state machine reacts to. Audio bytes and tool payloads stay
/// outside this type; only what changes the state crosses the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum SmEvent {
    LlmSpeechStarted,
    LlmSpeechStopped,
    LlmAudioDelta { item_id: String },
    LlmAudioDone,
    LlmFunctionCallArgumentsDone,
    ToolResultDelivered,
}

/// What the Bridge must do in response to a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    ClearTelephony,
    CancelResponse,
    TruncateItem { item_id: String, audio_end_ms: u64 },
    SetCurrentItem(String),
    ClearCurrentItem,
    DispatchTool,
    EmitToolOutputAndRespond,
}

/// Applies `event` to `state`, returning the next state and the side effects
/// to perform. `current_item_id` / `current_item_audio_ms` give the
/// transition enough context to compute barge-in's `audio_end_ms` (spec
/// §4.1 state table, scenario 3).
pub fn transition(
    state: ConversationState,
    event: SmEvent,
    current_item_id: Option<&str>,
    current_item_audio_ms: u64,
) -> (ConversationState, Vec<SideEffect>) {
    use ConversationState::*;
    use SmEvent::*;

    match (state, event) {
        (Idle, LlmSpeechStarted) => (UserSpeaking, vec![SideEffect::ClearTelephony]),

        (AiSpeaking, LlmSpeechStarted) => {
            let mut effects = vec![SideEffect::ClearTelephony, SideEffect::CancelResponse];
            if let Some(item_id) = current_item_id {
                effects.push(SideEffect::TruncateItem {
                    item_id: item_id.to_string(),
                    audio_end_ms: current_item_audio_ms,
                });
            }
            effects.push(SideEffect::ClearCurrentItem);
            (UserSpeaking, effects)
        }

        (UserSpeaking, LlmSpeechStopped) => (Idle, vec![]),

        (Idle, LlmAudioDelta { item_id }) | (UserSpeaking, LlmAudioDelta { item_id }) => {
            (AiSpeaking, vec![SideEffect::SetCurrentItem(item_id)])
        }

        (AiSpeaking, LlmAudioDone) => (Idle, vec![SideEffect::ClearCurrentItem]),

        (Idle, LlmFunctionCallArgumentsDone) | (AiSpeaking, LlmFunctionCallArgumentsDone) => {
            (ToolRunning, vec![SideEffect::DispatchTool])
        }

        (ToolRunning, ToolResultDelivered) => (Idle, vec![SideEffect::EmitToolOutputAndRespond]),

        (other, _) => (other, vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barge_in_clears_cancels_and_truncates_in_order() {
        let (next, effects) =
            transition(ConversationState::AiSpeaking, SmEvent::LlmSpeechStarted, Some("I1"), 640);
        assert_eq!(next, ConversationState::UserSpeaking);
        assert_eq!(
            effects,
            vec![
                SideEffect::ClearTelephony,
                SideEffect::CancelResponse,
                SideEffect::TruncateItem {
                    item_id: "I1".into(),
                    audio_end_ms: 640
                },
                SideEffect::ClearCurrentItem,
            ]
        );
    }

    #[test]
    fn clear_precedes_truncate_so_telephony_buffer_is_flushed_first() {
        let (_, effects) =
            transition(ConversationState::AiSpeaking, SmEvent::LlmSpeechStarted, Some("I1"), 100);
        let clear_pos = effects.iter().position(|e| *e == SideEffect::ClearTelephony).unwrap();
        let truncate_pos = effects
            .iter()
            .position(|e| matches!(e, SideEffect::TruncateItem { .. }))
            .unwrap();
        assert!(clear_pos < truncate_pos);
    }

    #[test]
    fn idle_speech_started_clears_without_cancel_or_truncate() {
        let (next, effects) = transition(ConversationState::Idle, SmEvent::LlmSpeechStarted, None, 0);
        assert_eq!(next, ConversationState::UserSpeaking);
        assert_eq!(effects, vec![SideEffect::ClearTelephony]);
    }

    #[test]
    fn audio_delta_sets_current_item_and_enters_ai_speaking() {
        let (next, effects) = transition(
            ConversationState::Idle,
            SmEvent::LlmAudioDelta { item_id: "I2".into() },
            None,
            0,
        );
        assert_eq!(next, ConversationState::AiSpeaking);
        assert_eq!(effects, vec![SideEffect::SetCurrentItem("I2".into())]);
    }

    #[test]
    fn audio_done_clears_current_item_and_returns_to_idle() {
        let (next, effects) =
            transition(ConversationState::AiSpeaking, SmEvent::LlmAudioDone, Some("I2"), 2000);
        assert_eq!(next, ConversationState::Idle);
        assert_eq!(effects, vec![SideEffect::ClearCurrentItem]);
    }

    #[test]
    fn function_call_from_ai_speaking_enters_tool_running() {
        let (next, effects) = transition(
            ConversationState::AiSpeaking,
            SmEvent::LlmFunctionCallArgumentsDone,
            Some("I3"),
            10,
        );
        assert_eq!(next, ConversationState::ToolRunning);
        assert_eq!(effects, vec![SideEffect::DispatchTool]);
    }

    #[test]
    fn tool_result_returns_to_idle_and_emits_output() {
        let (next, effects) =
            transition(ConversationState::ToolRunning, SmEvent::ToolResultDelivered, None, 0);
        assert_eq!(next, ConversationState::Idle);
        assert_eq!(effects, vec![SideEffect::EmitToolOutputAndRespond]);
    }

    #[test]
    fn unexpected_event_is_a_no_op() {
        let (next, effects) = transition(ConversationState::Idle, SmEvent::LlmAudioDone, None, 0);
        assert_eq!(next, ConversationState::Idle);
        assert!(effects.is_empty());
    }
}
