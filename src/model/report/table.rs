//! Flattening responses into one row per response, one column per question.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::{
    db::{form::FormCore, response::ResponseCore},
    mongodb::Id,
};

/// Cell text shown in place of a missing answer.
pub const PLACEHOLDER: &str = "-";

/// Name of the leading timestamp column.
pub const SUBMITTED_AT_COLUMN: &str = "submittedAt";

/// A single response, flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub submitted_at: DateTime<Utc>,
    /// One cell per question column; `None` where the question went unanswered.
    pub cells: Vec<Option<String>>,
}

impl Row {
    /// Cells for interactive display, with missing answers shown as [`PLACEHOLDER`].
    pub fn display_cells(&self) -> impl Iterator<Item = &str> {
        self.cells
            .iter()
            .map(|cell| cell.as_deref().unwrap_or(PLACEHOLDER))
    }

    fn csv_record(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(format_timestamp(self.submitted_at)).chain(
            self.cells
                .iter()
                .map(|cell| cell.clone().unwrap_or_default()),
        )
    }
}

/// Responses to a form as a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Question IDs, in form order.
    pub columns: Vec<Id>,
    /// One row per response, in input order.
    pub rows: Vec<Row>,
}

impl Table {
    /// The CSV header: the timestamp column followed by every question ID.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(SUBMITTED_AT_COLUMN.to_string())
            .chain(self.columns.iter().map(Id::to_string))
            .collect()
    }

    /// Serialise to a CSV document. Missing answers become empty fields.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.header())?;
        for row in &self.rows {
            writer.write_record(row.csv_record())?;
        }
        writer.into_inner().map_err(|e| e.into_error().into())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render a timestamp the way it appears in exported files.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Flatten the responses to a form into a [`Table`].
///
/// Answers to questions the form doesn't have are dropped; list answers are joined.
pub fn tabulate<'a, R>(form: &FormCore, responses: R) -> Table
where
    R: IntoIterator<Item = &'a ResponseCore>,
{
    let columns = form.questions.iter().map(|q| q.id).collect::<Vec<_>>();
    let rows = responses
        .into_iter()
        .map(|response| Row {
            submitted_at: response.submitted_at,
            cells: columns
                .iter()
                .map(|question_id| {
                    response
                        .answer(*question_id)
                        .map(|value| value.flatten().into_owned())
                })
                .collect(),
        })
        .collect();

    Table { columns, rows }
}
