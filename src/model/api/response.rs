use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    api::{form::FormDescription, id::ApiId},
    common::answer::AnswerValue,
    db::{
        form::Form,
        response::{Answer, NewResponse, Response, ResponseCore},
    },
    mongodb::Id,
};

/// Reasons a submitted response is rejected before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseSpecError {
    #[error("a response must answer at least one question")]
    NoAnswers,
    #[error("question '{0}' does not belong to this form")]
    UnknownQuestion(Id),
    #[error("question '{0}' is answered more than once")]
    DuplicateAnswer(Id),
    #[error("answer to question '{0}' is blank")]
    BlankAnswer(Id),
}

/// A response as submitted by a respondent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub answers: Vec<AnswerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSpec {
    pub question_id: Id,
    pub value: AnswerValue,
}

impl ResponseSpec {
    /// Check every answer against `form` and stamp the submission time.
    pub fn into_response(self, form: &Form) -> Result<NewResponse, ResponseSpecError> {
        if self.answers.is_empty() {
            return Err(ResponseSpecError::NoAnswers);
        }

        let mut answered = HashSet::with_capacity(self.answers.len());
        for answer in &self.answers {
            if form.question(answer.question_id).is_none() {
                return Err(ResponseSpecError::UnknownQuestion(answer.question_id));
            }
            if !answered.insert(answer.question_id) {
                return Err(ResponseSpecError::DuplicateAnswer(answer.question_id));
            }
            if answer.value.is_blank() {
                return Err(ResponseSpecError::BlankAnswer(answer.question_id));
            }
        }

        Ok(ResponseCore {
            form_id: form.id,
            submitted_at: Utc::now().trunc_subsecs(3),
            answers: self
                .answers
                .into_iter()
                .map(|a| Answer {
                    question_id: a.question_id,
                    value: a.value,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescription {
    pub id: ApiId,
    pub form_id: ApiId,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<AnswerDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDescription {
    pub question_id: ApiId,
    pub value: AnswerValue,
}

impl From<Response> for ResponseDescription {
    fn from(response: Response) -> Self {
        Self {
            id: response.id.into(),
            form_id: response.response.form_id.into(),
            submitted_at: response.response.submitted_at,
            answers: response
                .response
                .answers
                .into_iter()
                .map(|a| AnswerDescription {
                    question_id: a.question_id.into(),
                    value: a.value,
                })
                .collect(),
        }
    }
}

impl From<ResponseDescription> for Response {
    fn from(desc: ResponseDescription) -> Self {
        Self {
            id: desc.id.into(),
            response: ResponseCore {
                form_id: desc.form_id.into(),
                submitted_at: desc.submitted_at,
                answers: desc
                    .answers
                    .into_iter()
                    .map(|a| Answer {
                        question_id: a.question_id.into(),
                        value: a.value,
                    })
                    .collect(),
            },
        }
    }
}

/// Reply to a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseReceipt {
    pub id: ApiId,
    pub submitted_at: DateTime<Utc>,
}

/// A form and every response to it; the input of the report tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormResponses {
    pub form: FormDescription,
    pub responses: Vec<ResponseDescription>,
}


#[cfg(test)]
mod tests {
    use rocket::serde::json::{serde_json, serde_json::json};

    use super::*;

    #[test]
    fn accepts_valid_answers() {
        let form = Form::example();
        let response = ResponseSpec::example_for(&form).into_response(&form).unwrap();
        assert_eq!(response.form_id, form.id);
        assert_eq!(response.answers.len(), 3);
        assert_eq!(
            response.answer(form.questions[0].id),
            Some(&AnswerValue::from("Yes"))
        );
    }

    #[test]
    fn partial_answers_are_fine() {
        let form = Form::example();
        let mut spec = ResponseSpec::example_for(&form);
        spec.answers.truncate(1);
        assert!(spec.into_response(&form).is_ok());
    }

    #[test]
    fn rejects_invalid_answers() {
        let form = Form::example();

        let spec = ResponseSpec { answers: vec![] };
        assert_eq!(spec.into_response(&form), Err(ResponseSpecError::NoAnswers));

        let stranger = Id::new();
        let mut spec = ResponseSpec::example_for(&form);
        spec.answers[1].question_id = stranger;
        assert_eq!(
            spec.into_response(&form),
            Err(ResponseSpecError::UnknownQuestion(stranger))
        );

        let q = form.questions[0].id;
        let mut spec = ResponseSpec::example_for(&form);
        spec.answers[2].question_id = q;
        assert_eq!(
            spec.into_response(&form),
            Err(ResponseSpecError::DuplicateAnswer(q))
        );

        let mut spec = ResponseSpec::example_for(&form);
        spec.answers[1].value = AnswerValue::from("   ");
        assert_eq!(
            spec.into_response(&form),
            Err(ResponseSpecError::BlankAnswer(form.questions[1].id))
        );

        // One blank element is enough to reject a list answer.
        let mut spec = ResponseSpec::example_for(&form);
        spec.answers[2].value = AnswerValue::from(vec!["", "Maybe"]);
        assert_eq!(
            spec.into_response(&form),
            Err(ResponseSpecError::BlankAnswer(form.questions[2].id))
        );
    }

    #[test]
    fn wire_format() {
        let form = Form::example();
        let q1 = form.questions[0].id;
        let q3 = form.questions[2].id;
        let spec: ResponseSpec = serde_json::from_value(json!({
            "answers": [
                {"question_id": q1.to_string(), "value": "No"},
                {"question_id": q3.to_string(), "value": ["Friend", "Search"]},
            ]
        }))
        .unwrap();
        let response = spec.into_response(&form).unwrap();
        assert_eq!(
            response.answer(q3),
            Some(&AnswerValue::from(vec!["Friend", "Search"]))
        );
    }
}
