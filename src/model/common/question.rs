use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The kinds of question a form may ask.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Free text answer.
    Text,
    /// One of a fixed list of options.
    #[serde(alias = "multiple-choice")]
    SingleChoice,
}

impl QuestionKind {
    /// Does this kind of question carry a list of options?
    pub fn has_options(&self) -> bool {
        matches!(self, Self::SingleChoice)
    }
}

impl Display for QuestionKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Text => "text",
                Self::SingleChoice => "single-choice",
            }
        )
    }
}
