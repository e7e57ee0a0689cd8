//! Flashcard sets, their cards, and the cached read projection.

use super::errors::FlashcardError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::SubjectId;

/// Column width of every text field in the relational schema.
pub const MAX_FIELD_LEN: usize = 255;

/// A flashcard set with the cards it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashcardSet {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub creator_id: SubjectId,
    pub created_at: DateTime<Utc>,
    pub cards: Vec<Flashcard>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub id: i64,
    pub set_id: i64,
    pub question: String,
    pub answer: String,
}

impl FlashcardSet {
    pub fn projection(&self) -> FlashcardSetProjection {
        FlashcardSetProjection {
            set_id: self.id,
            title: self.title.clone(),
            subject: self.subject.clone(),
            creator_id: self.creator_id,
            cards: self
                .cards
                .iter()
                .map(|card| CardProjection {
                    card_id: card.id,
                    question: card.question.clone(),
                    answer: card.answer.clone(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// WRITE MODELS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewFlashcardSet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub cards: Vec<NewFlashcard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewFlashcard {
    pub question: String,
    pub answer: String,
}

impl NewFlashcardSet {
    pub fn validate(&self) -> Result<(), FlashcardError> {
        require_text("title", &self.title)?;
        require_text("subject", &self.subject)?;
        for card in &self.cards {
            require_text("question", &card.question)?;
            require_text("answer", &card.answer)?;
        }
        Ok(())
    }
}

/// Partial update. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FlashcardSetPatch {
    pub title: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub cards: Vec<CardPatch>,
}

/// Updates the card `card_id` if it belongs to the set, otherwise creates a
/// new card, which then needs both `question` and `answer`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardPatch {
    #[serde(rename = "cardId", alias = "card_id")]
    pub card_id: Option<i64>,
    pub question: Option<String>,
    pub answer: Option<String>,
}

impl FlashcardSetPatch {
    pub fn validate(&self) -> Result<(), FlashcardError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(subject) = &self.subject {
            require_text("subject", subject)?;
        }
        for card in &self.cards {
            for (field, value) in [("question", &card.question), ("answer", &card.answer)] {
                if let Some(value) = value {
                    require_text(field, value)?;
                }
            }
        }
        Ok(())
    }
}

impl CardPatch {
    /// Fields for a new card, or a validation error naming the missing one.
    pub fn as_new_card(&self) -> Result<NewFlashcard, FlashcardError> {
        let question = self
            .question
            .clone()
            .ok_or_else(|| FlashcardError::Validation("New cards require a question".into()))?;
        let answer = self
            .answer
            .clone()
            .ok_or_else(|| FlashcardError::Validation("New cards require an answer".into()))?;
        Ok(NewFlashcard { question, answer })
    }
}

fn require_text(field: &str, value: &str) -> Result<(), FlashcardError> {
    if value.trim().is_empty() {
        return Err(FlashcardError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > MAX_FIELD_LEN {
        return Err(FlashcardError::Validation(format!(
            "{field} must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(())
}

// =============================================================================
// READ PROJECTION
// =============================================================================

/// Denormalized read shape of a set; this is what the cache stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSetProjection {
    pub set_id: i64,
    pub title: String,
    pub subject: String,
    pub creator_id: SubjectId,
    pub cards: Vec<CardProjection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProjection {
    pub card_id: i64,
    pub question: String,
    pub answer: String,
}

/// Where a read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionSource {
    Cache,
    Store,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_set() -> FlashcardSet {
        FlashcardSet {
            id: 3,
            title: "Bio 101".into(),
            subject: "Biology".into(),
            creator_id: SubjectId(7),
            created_at: Utc::now(),
            cards: vec![Flashcard {
                id: 11,
                set_id: 3,
                question: "Powerhouse of the cell?".into(),
                answer: "Mitochondria".into(),
            }],
        }
    }

    #[test]
    fn test_projection_wire_shape() {
        let json = serde_json::to_value(sample_set().projection()).unwrap();
        assert_eq!(
            json,
            json!({
                "setId": 3,
                "title": "Bio 101",
                "subject": "Biology",
                "creatorId": 7,
                "cards": [{"cardId": 11, "question": "Powerhouse of the cell?", "answer": "Mitochondria"}]
            })
        );
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ProjectionSource::Cache).unwrap(), "cache");
        assert_eq!(serde_json::to_value(ProjectionSource::Store).unwrap(), "store");
    }

    #[test]
    fn test_new_set_requires_title_and_subject() {
        let missing: NewFlashcardSet = serde_json::from_value(json!({"subject": "Y"})).unwrap();
        assert_eq!(
            missing.validate(),
            Err(FlashcardError::Validation("title is required".into()))
        );

        let ok: NewFlashcardSet =
            serde_json::from_value(json!({"title": "X", "subject": "Y", "cards": []})).unwrap();
        assert!(ok.validate().is_ok());

        let long = NewFlashcardSet {
            title: "x".repeat(MAX_FIELD_LEN + 1),
            subject: "Y".into(),
            cards: vec![],
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_card_patch_new_card_needs_both_fields() {
        let patch = CardPatch {
            card_id: None,
            question: Some("Q".into()),
            answer: None,
        };
        assert!(patch.as_new_card().is_err());

        let patch: CardPatch =
            serde_json::from_value(json!({"cardId": 4, "question": "Q", "answer": "A"})).unwrap();
        assert_eq!(patch.card_id, Some(4));
        assert_eq!(
            patch.as_new_card().unwrap(),
            NewFlashcard {
                question: "Q".into(),
                answer: "A".into()
            }
        );
    }

    #[test]
    fn test_patch_rejects_blank_title() {
        let patch = FlashcardSetPatch {
            title: Some("  ".into()),
            ..FlashcardSetPatch::default()
        };
        assert!(patch.validate().is_err());
    }
}
