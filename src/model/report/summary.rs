//! Per-option tallies for single-choice questions.

use std::fmt::Formatter;

use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::model::{
    common::{answer::AnswerValue, question::QuestionKind},
    db::{form::FormCore, response::ResponseCore},
    mongodb::Id,
};

/// Response counts for each declared option of one question, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCounts(Vec<(String, u64)>);

impl OptionCounts {
    /// Every option at zero.
    pub fn zeroed(options: &[String]) -> Self {
        Self(options.iter().map(|option| (option.clone(), 0)).collect())
    }

    /// Count one vote for `option`. Returns false, changing nothing, if it isn't declared.
    pub fn increment(&mut self, option: &str) -> bool {
        match self.0.iter_mut().find(|(declared, _)| declared == option) {
            Some((_, count)) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    /// Count every matching value of an answer.
    pub fn record(&mut self, value: &AnswerValue) {
        match value {
            AnswerValue::Single(option) => {
                self.increment(option);
            }
            AnswerValue::Multi(options) => {
                for option in options {
                    self.increment(option);
                }
            }
        }
    }

    /// The count for one option, or `None` if it isn't declared.
    pub fn get(&self, option: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(declared, _)| declared == option)
            .map(|(_, count)| *count)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(option, count)| (option.as_str(), *count))
    }

    /// Each option's share of the total, as a whole percentage.
    pub fn percentages(&self) -> Vec<(&str, u64)> {
        let total = self.total();
        self.iter()
            .map(|(option, count)| (option, percentage(count, total)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for OptionCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (option, count) in &self.0 {
            map.serialize_entry(option, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OptionCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = OptionCounts;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                write!(formatter, "a map of options to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut counts = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, u64>()? {
                    counts.push(entry);
                }
                Ok(OptionCounts(counts))
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}

/// `count` as a percentage of `total`, rounded half-up. Zero when `total` is zero.
pub fn percentage(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    // Integer form of floor(100 * count / total + 0.5).
    (200 * count + total) / (2 * total)
}

/// The tally of a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionTally {
    pub question_id: Id,
    pub counts: OptionCounts,
}

/// Option counts for every single-choice question of a form, in question order.
/// Text questions never appear.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    pub questions: Vec<QuestionTally>,
}

impl Summary {
    /// The counts for the given question, if it is a single-choice question of the form.
    pub fn get(&self, question_id: Id) -> Option<&OptionCounts> {
        self.questions
            .iter()
            .find(|tally| tally.question_id == question_id)
            .map(|tally| &tally.counts)
    }

    fn get_mut(&mut self, question_id: Id) -> Option<&mut OptionCounts> {
        self.questions
            .iter_mut()
            .find(|tally| tally.question_id == question_id)
            .map(|tally| &mut tally.counts)
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Serialises as `{ "<question id>": { "<option>": count, ... }, ... }`.
impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.questions.len()))?;
        for tally in &self.questions {
            map.serialize_entry(&tally.question_id.to_string(), &tally.counts)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Summary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SummaryVisitor;

        impl<'de> Visitor<'de> for SummaryVisitor {
            type Value = Summary;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                write!(formatter, "a map of question IDs to option counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut questions = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, counts)) = map.next_entry::<String, OptionCounts>()? {
                    let question_id = key.parse::<Id>().map_err(de::Error::custom)?;
                    questions.push(QuestionTally {
                        question_id,
                        counts,
                    });
                }
                Ok(Summary { questions })
            }
        }

        deserializer.deserialize_map(SummaryVisitor)
    }
}

/// Tally the responses to a form.
///
/// Every declared option of every single-choice question appears in the result, even
/// with no votes. Answers to unknown or text questions, and values that don't match a
/// declared option, are skipped without affecting anything else.
pub fn summarize<'a, R>(form: &FormCore, responses: R) -> Summary
where
    R: IntoIterator<Item = &'a ResponseCore>,
{
    let mut summary = Summary {
        questions: form
            .questions
            .iter()
            .filter(|question| question.kind == QuestionKind::SingleChoice)
            .map(|question| QuestionTally {
                question_id: question.id,
                counts: OptionCounts::zeroed(&question.options),
            })
            .collect(),
    };

    for response in responses {
        for answer in &response.answers {
            if let Some(counts) = summary.get_mut(answer.question_id) {
                counts.record(&answer.value);
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use crate::model::db::{
        form::{Form, Question},
        response::Response,
    };

    use super::*;

    fn responses_of(form: &Form, answers: Vec<Vec<(Id, AnswerValue)>>) -> Vec<Response> {
        answers
            .into_iter()
            .map(|a| Response::example(form.id, a))
            .collect()
    }

    #[test]
    fn yes_no_example() {
        let form = Form::with_questions(vec![Question::single_choice("Happy?", &["Yes", "No"])]);
        let q = form.questions[0].id;
        let responses = responses_of(
            &form,
            vec![
                vec![(q, "Yes".into())],
                vec![(q, "Yes".into())],
                vec![(q, "No".into())],
            ],
        );

        let summary = summarize(&form, responses.iter().map(|r| &**r));
        let counts = summary.get(q).unwrap();
        assert_eq!(counts.get("Yes"), Some(2));
        assert_eq!(counts.get("No"), Some(1));
        assert_eq!(counts.percentages(), vec![("Yes", 67), ("No", 33)]);
    }

    #[test]
    fn zero_responses_lists_every_option() {
        let form = Form::example();
        let summary = summarize(&form, std::iter::empty());

        assert_eq!(summary.questions.len(), 2);
        for question in form.questions.iter() {
            match question.kind {
                QuestionKind::Text => assert!(summary.get(question.id).is_none()),
                QuestionKind::SingleChoice => {
                    let counts = summary.get(question.id).unwrap();
                    assert_eq!(counts.len(), question.options.len());
                    assert!(counts.iter().all(|(_, count)| count == 0));
                    assert!(counts.percentages().iter().all(|(_, p)| *p == 0));
                }
            }
        }
    }

    #[test]
    fn text_questions_are_excluded() {
        let form = Form::with_questions(vec![Question::text("Thoughts?")]);
        let q = form.questions[0].id;
        let responses = responses_of(
            &form,
            vec![vec![(q, "Great".into())], vec![(q, "Meh".into())]],
        );

        let summary = summarize(&form, responses.iter().map(|r| &**r));
        assert!(summary.is_empty());
    }

    #[test]
    fn unmatched_values_are_ignored() {
        let form = Form::example();
        let choice = form.questions[0].id;
        let other_choice = form.questions[2].id;
        let responses = responses_of(
            &form,
            vec![
                vec![(choice, "Maybe".into()), (other_choice, "Friend".into())],
                vec![(choice, "yes".into()), (Id::new(), "Yes".into())],
                vec![(choice, "Yes".into())],
            ],
        );

        let summary = summarize(&form, responses.iter().map(|r| &**r));
        let counts = summary.get(choice).unwrap();
        assert_eq!(counts.get("Yes"), Some(1));
        assert_eq!(counts.get("No"), Some(0));
        assert_eq!(counts.get("Maybe"), None);
        assert_eq!(counts.total(), 1);
        assert_eq!(summary.get(other_choice).unwrap().get("Friend"), Some(1));
    }

    #[test]
    fn list_values_count_each_element() {
        let form = Form::example();
        let q = form.questions[2].id;
        let responses = responses_of(
            &form,
            vec![
                vec![(q, vec!["Friend", "Search"].into())],
                vec![(q, vec!["Search", "Nowhere"].into())],
            ],
        );

        let summary = summarize(&form, responses.iter().map(|r| &**r));
        let counts = summary.get(q).unwrap();
        assert_eq!(counts.get("Friend"), Some(1));
        assert_eq!(counts.get("Advert"), Some(0));
        assert_eq!(counts.get("Search"), Some(2));
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn percentage_rounding() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(7, 7), 100);
    }

    #[test]
    fn percentages_sum_to_about_one_hundred() {
        for votes in [vec![1, 1, 1], vec![5, 3, 1, 1], vec![1, 2, 3, 4, 5], vec![0, 9, 0]] {
            let options = (0..votes.len())
                .map(|i| format!("Option {i}"))
                .collect::<Vec<_>>();
            let mut counts = OptionCounts::zeroed(&options);
            for (option, n) in options.iter().zip(&votes) {
                for _ in 0..*n {
                    counts.increment(option);
                }
            }
            let sum: u64 = counts.percentages().iter().map(|(_, p)| p).sum();
            let slack = options.len() as u64;
            assert!(
                (100 - slack..=100 + slack).contains(&sum),
                "{votes:?} summed to {sum}"
            );
        }
    }

    #[test]
    fn serialises_in_declaration_order() {
        let form = Form::with_questions(vec![Question::single_choice(
            "Pick",
            &["Zebra", "Apple", "Mango"],
        )]);
        let q = form.questions[0].id;
        let responses = responses_of(&form, vec![vec![(q, "Mango".into())]]);

        let summary = summarize(&form, responses.iter().map(|r| &**r));
        let serialised = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            serialised,
            format!(r#"{{"{q}":{{"Zebra":0,"Apple":0,"Mango":1}}}}"#)
        );

        let parsed: Summary = serde_json::from_str(&serialised).unwrap();
        assert_eq!(parsed, summary);
        serde_json::from_str::<Summary>(r#"{"not-an-id":{"A":1}}"#).unwrap_err();
    }
}
