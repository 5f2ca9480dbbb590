//! Read-only content catalog types
//!
//! Topics, chapters, tiers and questions are authored by the content
//! collaborator. The engine reads them and never writes them back.

use serde::{Deserialize, Serialize};

/// Question difficulty band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EASY" => Some(Self::Easy),
            "MEDIUM" => Some(Self::Medium),
            "HARD" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// A subject area, e.g. "Mathematics"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    /// Grade band this topic targets, e.g. "6-8"
    pub grade_band: Option<String>,
}

/// A chapter within a topic; tiers are ordered within a chapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub topic_id: String,
    pub name: String,
}

/// An ordered difficulty stage within a chapter
///
/// The tier named "Diagnostic" is special: it has no prerequisite, and
/// passing it governs the Beginner unlock. All other gating goes by
/// `order_index`, not by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier {
    pub id: String,
    pub chapter_id: String,
    pub name: String,
    pub order_index: u32,
}

impl Tier {
    /// Whether this tier is the prerequisite-free diagnostic stage
    pub fn is_diagnostic(&self) -> bool {
        self.name == "Diagnostic"
    }
}

/// One selectable answer on a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

/// A single scored multiple-choice item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub tier_id: String,
    pub text: String,
    pub difficulty: Difficulty,
    pub options: Vec<QuestionOption>,
    /// The option id that counts as correct
    pub correct_option_id: String,
    /// Authored feedback shown after a correct answer
    pub correct_feedback: Option<String>,
    /// Authored feedback shown after an incorrect answer
    pub incorrect_feedback: Option<String>,
}

impl Question {
    /// Feedback text for an outcome, with generic fallbacks when authoring
    /// omitted the per-outcome text
    pub fn feedback_for(&self, correct: bool) -> String {
        if correct {
            self.correct_feedback
                .clone()
                .unwrap_or_else(|| "Correct!".to_string())
        } else {
            self.incorrect_feedback
                .clone()
                .unwrap_or_else(|| "Incorrect.".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_roundtrip() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let s = difficulty.as_str();
            assert_eq!(Difficulty::parse(s), Some(difficulty));
        }
    }

    #[test]
    fn test_difficulty_parse_unknown() {
        assert_eq!(Difficulty::parse("IMPOSSIBLE"), None);
    }

    #[test]
    fn test_difficulty_serde_wire_format() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "\"HARD\"");

        let parsed: Difficulty = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(parsed, Difficulty::Medium);
    }

    #[test]
    fn test_tier_is_diagnostic() {
        let tier = Tier {
            id: "t1".into(),
            chapter_id: "ch1".into(),
            name: "Diagnostic".into(),
            order_index: 0,
        };
        assert!(tier.is_diagnostic());

        let tier = Tier {
            id: "t2".into(),
            chapter_id: "ch1".into(),
            name: "Beginner".into(),
            order_index: 1,
        };
        assert!(!tier.is_diagnostic());
    }

    fn question_with_feedback(
        correct_feedback: Option<&str>,
        incorrect_feedback: Option<&str>,
    ) -> Question {
        Question {
            id: "q1".into(),
            tier_id: "t1".into(),
            text: "What is 1/2 + 1/4?".into(),
            difficulty: Difficulty::Easy,
            options: vec![
                QuestionOption {
                    id: "a".into(),
                    text: "3/4".into(),
                },
                QuestionOption {
                    id: "b".into(),
                    text: "2/6".into(),
                },
            ],
            correct_option_id: "a".into(),
            correct_feedback: correct_feedback.map(String::from),
            incorrect_feedback: incorrect_feedback.map(String::from),
        }
    }

    #[test]
    fn test_feedback_uses_authored_text() {
        let question = question_with_feedback(Some("Nice work"), Some("Check the denominators"));
        assert_eq!(question.feedback_for(true), "Nice work");
        assert_eq!(question.feedback_for(false), "Check the denominators");
    }

    #[test]
    fn test_feedback_falls_back_to_generic_strings() {
        let question = question_with_feedback(None, None);
        assert_eq!(question.feedback_for(true), "Correct!");
        assert_eq!(question.feedback_for(false), "Incorrect.");
    }
}
