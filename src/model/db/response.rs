use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::answer::AnswerValue,
    mongodb::{Coll, Id},
};

/// Core response data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCore {
    /// The form being answered.
    pub form_id: Id,
    /// Submission time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
}

impl ResponseCore {
    /// The value given for the given question, if any.
    pub fn answer(&self, question_id: Id) -> Option<&AnswerValue> {
        self.answers
            .iter()
            .find(|answer| answer.question_id == question_id)
            .map(|answer| &answer.value)
    }
}

/// A response without an ID.
pub type NewResponse = ResponseCore;

/// A response from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub response: ResponseCore,
}

impl Response {
    /// Fetch every response to the given form, oldest first.
    pub async fn fetch_for_form(responses: &Coll<Response>, form_id: Id) -> Result<Vec<Self>> {
        let filter = doc! {
            "form_id": form_id,
        };
        let options = FindOptions::builder()
            .sort(doc! {"submitted_at": 1, "_id": 1})
            .build();
        let responses = responses
            .find(filter, options)
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        Ok(responses)
    }
}

impl Deref for Response {
    type Target = ResponseCore;

    fn deref(&self) -> &Self::Target {
        &self.response
    }
}

impl DerefMut for Response {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.response
    }
}

/// One question's answer within a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: Id,
    pub value: AnswerValue,
}
