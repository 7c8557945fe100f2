//! Orchestration record and intent precedence.

use serde::{Deserialize, Serialize};

/// The structured classification of one user turn.
///
/// This is the raw record the classifier model produces. Fields are advisory
/// and not mutually exclusive; [`Orchestration::primary_intent`] imposes the
/// precedence order so exactly one handler runs per request. Every field
/// defaults, so a partial or sparse model response still parses, and unknown
/// keys are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Orchestration {
    /// The user asked for an image to be generated.
    #[serde(default)]
    pub image_generation: bool,
    /// Prompt to pass to the image backend when `image_generation` is set.
    #[serde(default)]
    pub image_prompt: String,
    /// The user asked for something that needs current information.
    #[serde(default)]
    pub internet_search: bool,
    /// The user asked about uploaded files.
    #[serde(default)]
    pub file_orchestration: bool,
    /// Ids of the files the user referenced (as strings).
    #[serde(default)]
    pub file_ids: Vec<String>,
    /// The user asked about this service's own code.
    #[serde(default)]
    pub code_orchestration: bool,
    /// The user asked to visualize the codebase structure.
    #[serde(default)]
    pub code_structure_orchestration: bool,
    /// `[lo, hi]` when the user asked for a random number in a range.
    #[serde(default)]
    pub rand_num: Vec<i64>,
}

/// The single handler selected for a turn, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryIntent {
    /// Generate an image and return it directly.
    ImageGeneration,
    /// Render a codebase structure diagram and return it directly.
    CodeStructure,
    /// Answer about uploaded files.
    FileOrchestration,
    /// Ground the reply in this service's own code.
    CodeOrchestration,
    /// Ground the reply in web search results.
    InternetSearch,
    /// Return a random number in a range.
    RandomNumber,
    /// Plain chat.
    Chat,
}

impl Orchestration {
    /// Select the handler for this record.
    ///
    /// Checked strictly in precedence order; the first set flag wins even
    /// when the classifier set several.
    pub fn primary_intent(&self) -> PrimaryIntent {
        if self.image_generation {
            PrimaryIntent::ImageGeneration
        } else if self.code_structure_orchestration {
            PrimaryIntent::CodeStructure
        } else if self.file_orchestration {
            PrimaryIntent::FileOrchestration
        } else if self.code_orchestration {
            PrimaryIntent::CodeOrchestration
        } else if self.internet_search {
            PrimaryIntent::InternetSearch
        } else if !self.rand_num.is_empty() {
            PrimaryIntent::RandomNumber
        } else {
            PrimaryIntent::Chat
        }
    }
}

impl PrimaryIntent {
    /// Status line pushed to the client while this handler runs.
    pub fn status_message(&self) -> &'static str {
        match self {
            Self::ImageGeneration => "Creating the image...",
            Self::CodeStructure | Self::CodeOrchestration => "Processing your code request...",
            Self::FileOrchestration => "Analyzing the uploaded file...",
            Self::InternetSearch => "Searching the internet...",
            Self::RandomNumber | Self::Chat => "Assistant is thinking...",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let json = r#"{
            "image_generation": true,
            "image_prompt": "a flag",
            "internet_search": false,
            "file_orchestration": false,
            "file_ids": [],
            "code_orchestration": false,
            "code_structure_orchestration": false,
            "rand_num": []
        }"#;

        let record: Orchestration = serde_json::from_str(json).unwrap();
        assert!(record.image_generation);
        assert_eq!(record.image_prompt, "a flag");
        assert_eq!(record.primary_intent(), PrimaryIntent::ImageGeneration);
    }

    #[test]
    fn test_parse_sparse_record_defaults() {
        let record: Orchestration = serde_json::from_str(r#"{"internet_search": true}"#).unwrap();
        assert!(record.internet_search);
        assert!(!record.image_generation);
        assert!(record.file_ids.is_empty());
        assert!(record.rand_num.is_empty());
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let record: Orchestration =
            serde_json::from_str(r#"{"internet_search": true, "active_users": true}"#).unwrap();
        assert_eq!(record.primary_intent(), PrimaryIntent::InternetSearch);
    }

    #[test]
    fn test_malformed_type_fails_parse() {
        // Non-boolean flag fails the whole parse; the classifier then falls
        // back to the default record.
        let result = serde_json::from_str::<Orchestration>(r#"{"internet_search": "yes"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_record_is_chat() {
        assert_eq!(Orchestration::default().primary_intent(), PrimaryIntent::Chat);
    }

    #[test]
    fn test_image_wins_over_search() {
        let record = Orchestration {
            image_generation: true,
            internet_search: true,
            ..Default::default()
        };
        assert_eq!(record.primary_intent(), PrimaryIntent::ImageGeneration);
    }

    #[test]
    fn test_precedence_order() {
        let all = Orchestration {
            image_generation: true,
            code_structure_orchestration: true,
            file_orchestration: true,
            code_orchestration: true,
            internet_search: true,
            rand_num: vec![1, 10],
            ..Default::default()
        };
        assert_eq!(all.primary_intent(), PrimaryIntent::ImageGeneration);

        let without_image = Orchestration {
            image_generation: false,
            ..all.clone()
        };
        assert_eq!(without_image.primary_intent(), PrimaryIntent::CodeStructure);

        let files_and_search = Orchestration {
            file_orchestration: true,
            internet_search: true,
            ..Default::default()
        };
        assert_eq!(
            files_and_search.primary_intent(),
            PrimaryIntent::FileOrchestration
        );
    }

    #[test]
    fn test_rand_num_triggers_even_with_bad_arity() {
        let record = Orchestration {
            rand_num: vec![5],
            ..Default::default()
        };
        // Arity is validated by the handler, not the precedence check.
        assert_eq!(record.primary_intent(), PrimaryIntent::RandomNumber);
    }
}
