use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::question::QuestionKind,
    mongodb::{Coll, Id},
};

/// Core form data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCore {
    /// Form title.
    pub title: String,
    /// Questions, in display order.
    pub questions: Vec<Question>,
    /// The admin that created this form.
    pub owner_id: Id,
    /// Creation time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl FormCore {
    /// Look up one of this form's questions.
    pub fn question(&self, question_id: Id) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// A form without an ID.
pub type NewForm = FormCore;

/// A form from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub form: FormCore,
}

impl Form {
    /// Fetch a form by ID, failing with [`Error::NotFound`] if it doesn't exist.
    pub async fn fetch(forms: &Coll<Form>, form_id: Id) -> Result<Self> {
        forms
            .find_one(form_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Form with ID '{}'", form_id)))
    }
}

impl Deref for Form {
    type Target = FormCore;

    fn deref(&self) -> &Self::Target {
        &self.form
    }
}

impl DerefMut for Form {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.form
    }
}

/// A single question, embedded in its form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique ID within the form.
    pub id: Id,
    /// Kind of answer expected.
    pub kind: QuestionKind,
    /// Question text.
    pub prompt: String,
    /// Possible answers; empty unless the kind has options.
    #[serde(default)]
    pub options: Vec<String>,
}
