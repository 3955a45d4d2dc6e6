use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Separator used when a multi-valued answer is flattened into a single cell.
pub const MULTI_VALUE_DELIMITER: &str = "; ";

/// The value given for one question.
///
/// On the wire this is either a bare string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    /// The individual values, one for a single answer.
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multi(values) => values,
        }
    }

    /// True if there are no values, or any of them is only whitespace.
    pub fn is_blank(&self) -> bool {
        let values = self.values();
        values.is_empty() || values.iter().any(|value| value.trim().is_empty())
    }

    /// Flatten into a single string, joining multiple values.
    pub fn flatten(&self) -> Cow<'_, str> {
        match self {
            Self::Single(value) => Cow::Borrowed(value),
            Self::Multi(values) => Cow::Owned(values.join(MULTI_VALUE_DELIMITER)),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(String::from).collect())
    }
}
