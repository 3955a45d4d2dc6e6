use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    api::id::ApiId,
    common::question::QuestionKind,
    db::form::{Form, FormCore, NewForm, Question},
    mongodb::Id,
};

pub const MIN_QUESTIONS: usize = 3;
pub const MAX_QUESTIONS: usize = 5;
pub const MIN_OPTIONS: usize = 2;

/// Reasons a form specification is rejected. Question numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormSpecError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("a form needs {}-{} questions, got {0}", MIN_QUESTIONS, MAX_QUESTIONS)]
    QuestionCount(usize),
    #[error("question {0} has no prompt")]
    EmptyPrompt(usize),
    #[error("question {0} needs at least {} options", MIN_OPTIONS)]
    TooFewOptions(usize),
    #[error("question {0} has an empty option")]
    EmptyOption(usize),
    #[error("question {0} lists option '{1}' more than once")]
    DuplicateOption(usize, String),
}

/// A form specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSpec {
    /// Form title.
    pub title: String,
    /// Question specifications, in display order.
    pub questions: Vec<QuestionSpec>,
}

impl FormSpec {
    /// Validate this spec and convert it into a new form owned by `owner_id`,
    /// assigning every question a fresh ID.
    pub fn into_form(self, owner_id: Id) -> Result<NewForm, FormSpecError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(FormSpecError::EmptyTitle);
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.questions.len()) {
            return Err(FormSpecError::QuestionCount(self.questions.len()));
        }
        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| q.into_question(i + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FormCore {
            title,
            questions,
            owner_id,
            // The store keeps millisecond precision.
            created_at: Utc::now().trunc_subsecs(3),
        })
    }
}

/// A question specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub kind: QuestionKind,
    /// Question text.
    pub prompt: String,
    /// Possible answers; ignored for text questions.
    #[serde(default)]
    pub options: Vec<String>,
}

impl QuestionSpec {
    /// Validate this spec and convert it into a question with a fresh ID.
    /// `number` is only used in error messages.
    fn into_question(self, number: usize) -> Result<Question, FormSpecError> {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(FormSpecError::EmptyPrompt(number));
        }

        let options = if self.kind.has_options() {
            if self.options.len() < MIN_OPTIONS {
                return Err(FormSpecError::TooFewOptions(number));
            }
            let mut seen = HashSet::with_capacity(self.options.len());
            for option in &self.options {
                if option.trim().is_empty() {
                    return Err(FormSpecError::EmptyOption(number));
                }
                if !seen.insert(option.as_str()) {
                    return Err(FormSpecError::DuplicateOption(number, option.clone()));
                }
            }
            self.options
        } else {
            Vec::new()
        };

        Ok(Question {
            id: Id::new(),
            kind: self.kind,
            prompt,
            options,
        })
    }
}

/// API-friendly view of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDescription {
    pub id: ApiId,
    pub title: String,
    pub questions: Vec<QuestionDescription>,
    pub owner_id: ApiId,
    pub created_at: DateTime<Utc>,
}

impl From<Form> for FormDescription {
    fn from(form: Form) -> Self {
        Self {
            id: form.id.into(),
            title: form.form.title,
            questions: form.form.questions.into_iter().map(Into::into).collect(),
            owner_id: form.form.owner_id.into(),
            created_at: form.form.created_at,
        }
    }
}

impl From<FormDescription> for Form {
    fn from(desc: FormDescription) -> Self {
        Self {
            id: desc.id.into(),
            form: FormCore {
                title: desc.title,
                questions: desc.questions.into_iter().map(Into::into).collect(),
                owner_id: desc.owner_id.into(),
                created_at: desc.created_at,
            },
        }
    }
}

/// API-friendly view of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDescription {
    pub id: ApiId,
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
}

impl From<Question> for QuestionDescription {
    fn from(question: Question) -> Self {
        Self {
            id: question.id.into(),
            kind: question.kind,
            prompt: question.prompt,
            options: question.options,
        }
    }
}

impl From<QuestionDescription> for Question {
    fn from(desc: QuestionDescription) -> Self {
        Self {
            id: desc.id.into(),
            kind: desc.kind,
            prompt: desc.prompt,
            options: desc.options,
        }
    }
}

/// Reply to a successful form creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCreated {
    pub form: FormDescription,
    /// Where respondents can fetch the form.
    pub public_url: String,
}
