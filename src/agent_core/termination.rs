//! Termination evaluation.
//!
//! The conversation is done when a Presenter has produced a successful
//! response that looks like a finished item: it must carry both a question
//! marker and an answer marker. A Presenter turn that merely talks about the
//! vignette does not end the loop.

use crate::inference::config::TerminationConfig;

use super::transcript::Transcript;
use super::types::AgentRole;

/// Decides whether a transcript has reached a presentable conclusion.
#[derive(Debug, Clone)]
pub struct TerminationEvaluator {
    question_markers: Vec<String>,
    answer_markers: Vec<String>,
}

impl Default for TerminationEvaluator {
    fn default() -> Self {
        Self::from_config(&TerminationConfig::default())
    }
}

impl TerminationEvaluator {
    /// Build from config. Markers are matched case-insensitively; blank
    /// markers are dropped.
    pub fn from_config(config: &TerminationConfig) -> Self {
        fn normalize(markers: &[String]) -> Vec<String> {
            markers
                .iter()
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect()
        }

        Self {
            question_markers: normalize(&config.question_markers),
            answer_markers: normalize(&config.answer_markers),
        }
    }

    /// True when any successful Presenter response is well-formed.
    pub fn is_done(&self, transcript: &Transcript) -> bool {
        transcript
            .responses_by_role(AgentRole::Presenter)
            .any(|m| self.well_formed(&m.content))
    }

    /// Minimal structure check: at least one question marker and one answer
    /// marker. An empty marker list never matches.
    pub fn well_formed(&self, content: &str) -> bool {
        let lower = content.to_lowercase();
        let has_question = self.question_markers.iter().any(|m| lower.contains(m.as_str()));
        let has_answer = self.answer_markers.iter().any(|m| lower.contains(m.as_str()));
        has_question && has_answer
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::types::{AgentId, MessageKind, NewMessage};
    use crate::inference::errors::TurnFailureKind;

    const WELL_FORMED: &str = "{\n 'question': ['A 29-year-old woman presents with ...'],\n \
        'correct_answer': ['Periventricular plaques'],\n 'incorrect_answers': ['...'],\n}";

    fn push(t: &mut Transcript, role: AgentRole, content: &str, kind: MessageKind) {
        t.append(NewMessage {
            speaker_id: AgentId::new(role.as_str()),
            speaker_role: role,
            content: content.to_string(),
            kind,
        });
    }

    #[test]
    fn test_well_formed_requires_both_markers() {
        let eval = TerminationEvaluator::default();
        assert!(eval.well_formed(WELL_FORMED));
        assert!(eval.well_formed("QUESTION: which lesion?\nCorrect answer: C"));
        assert!(!eval.well_formed("Here is the question I will present shortly."));
        assert!(!eval.well_formed("The correct answer is C."));
        assert!(!eval.well_formed(""));
    }

    #[test]
    fn test_done_on_well_formed_presenter() {
        let eval = TerminationEvaluator::default();
        let mut t = Transcript::new();
        push(&mut t, AgentRole::Coordinator, "topic", MessageKind::Seed);
        push(&mut t, AgentRole::Generator, WELL_FORMED, MessageKind::Response);
        assert!(!eval.is_done(&t), "a draft from the author is not a conclusion");

        push(&mut t, AgentRole::Presenter, WELL_FORMED, MessageKind::Response);
        assert!(eval.is_done(&t));
    }

    #[test]
    fn test_premature_presenter_does_not_terminate() {
        let eval = TerminationEvaluator::default();
        let mut t = Transcript::new();
        push(&mut t, AgentRole::Coordinator, "topic", MessageKind::Seed);
        push(
            &mut t,
            AgentRole::Presenter,
            "I'll present the vignette once reviewers are done.",
            MessageKind::Response,
        );
        assert!(!eval.is_done(&t));
    }

    #[test]
    fn test_failed_presenter_turn_does_not_terminate() {
        let eval = TerminationEvaluator::default();
        let mut t = Transcript::new();
        push(&mut t, AgentRole::Coordinator, "topic", MessageKind::Seed);
        push(
            &mut t,
            AgentRole::Presenter,
            "[turn failed: malformed_response] question correct_answer",
            MessageKind::TurnFailure {
                failure: TurnFailureKind::MalformedResponse,
            },
        );
        assert!(!eval.is_done(&t));
    }

    #[test]
    fn test_custom_markers() {
        let eval = TerminationEvaluator::from_config(&TerminationConfig {
            question_markers: vec!["STEM".to_string(), "  ".to_string()],
            answer_markers: vec!["Key:".to_string()],
        });
        assert!(eval.well_formed("stem: ...\nkey: B"));
        assert!(!eval.well_formed(WELL_FORMED));
    }

    #[test]
    fn test_empty_marker_list_never_matches() {
        let eval = TerminationEvaluator::from_config(&TerminationConfig {
            question_markers: vec![],
            answer_markers: vec!["answer".to_string()],
        });
        assert!(!eval.well_formed("question answer"));
    }
}
