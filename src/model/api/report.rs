use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::form::Form,
    report::{FormReport, Summary, Table},
};

/// Aggregated counts for a form, with percentages, labelled for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDescription {
    pub form_id: ApiId,
    pub title: String,
    pub total_responses: u64,
    /// Single-choice questions only, in form order.
    pub questions: Vec<QuestionSummary>,
    /// The bare counts, keyed by question ID and then option.
    pub counts: Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub question_id: ApiId,
    pub prompt: String,
    /// Number of counted votes. List answers contribute one per matching element.
    pub total: u64,
    pub options: Vec<OptionSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSummary {
    pub option: String,
    pub count: u64,
    pub percentage: u64,
}

impl SummaryDescription {
    pub fn new(form: &Form, summary: &Summary, total_responses: usize) -> Self {
        let questions = summary
            .questions
            .iter()
            .map(|tally| QuestionSummary {
                question_id: tally.question_id.into(),
                prompt: form
                    .question(tally.question_id)
                    .map(|q| q.prompt.clone())
                    .unwrap_or_default(),
                total: tally.counts.total(),
                options: tally
                    .counts
                    .iter()
                    .zip(tally.counts.percentages())
                    .map(|((option, count), (_, percentage))| OptionSummary {
                        option: option.to_string(),
                        count,
                        percentage,
                    })
                    .collect(),
            })
            .collect();

        Self {
            form_id: form.id.into(),
            title: form.title.clone(),
            total_responses: total_responses as u64,
            questions,
            counts: summary.clone(),
        }
    }
}

impl From<&FormReport> for SummaryDescription {
    fn from(report: &FormReport) -> Self {
        Self::new(&report.form, &report.summarize(), report.responses.len())
    }
}

/// The response table, as shown to an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub form_id: ApiId,
    pub columns: Vec<ColumnDescription>,
    pub rows: Vec<RowDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub question_id: ApiId,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDescription {
    pub submitted_at: DateTime<Utc>,
    /// One cell per column, with unanswered questions shown as a placeholder.
    pub cells: Vec<String>,
}

impl TableDescription {
    pub fn new(form: &Form, table: &Table) -> Self {
        Self {
            form_id: form.id.into(),
            columns: form
                .questions
                .iter()
                .map(|q| ColumnDescription {
                    question_id: q.id.into(),
                    prompt: q.prompt.clone(),
                })
                .collect(),
            rows: table
                .rows
                .iter()
                .map(|row| RowDescription {
                    submitted_at: row.submitted_at,
                    cells: row.display_cells().map(str::to_string).collect(),
                })
                .collect(),
        }
    }
}

impl From<&FormReport> for TableDescription {
    fn from(report: &FormReport) -> Self {
        Self::new(&report.form, &report.tabulate())
    }
}
