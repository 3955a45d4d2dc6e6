//! Read-only reports over a form's responses: option tallies and the flattened table.
//!
//! Both are pure transforms of a form and its responses; [`FormReport`] pairs them
//! with the store reads that feed them.

pub mod summary;
pub mod table;

pub use summary::{percentage, summarize, OptionCounts, QuestionTally, Summary};
pub use table::{tabulate, Row, Table, PLACEHOLDER};

use crate::error::{Error, Result};
use crate::model::{
    db::{form::Form, response::Response},
    mongodb::{Coll, Id},
};

/// A form together with every response submitted to it.
#[derive(Debug, Clone)]
pub struct FormReport {
    pub form: Form,
    pub responses: Vec<Response>,
}

impl FormReport {
    /// Read a form and all of its responses.
    ///
    /// Fails with [`Error::NotFound`] if the form doesn't exist; store errors are
    /// passed through unchanged.
    pub async fn load(forms: &Coll<Form>, responses: &Coll<Response>, form_id: Id) -> Result<Self> {
        let form = Form::fetch(forms, form_id).await?;
        let responses = Response::fetch_for_form(responses, form_id).await?;
        debug!(
            "Loaded form {} with {} response(s)",
            form_id,
            responses.len()
        );
        Ok(Self { form, responses })
    }

    pub fn summarize(&self) -> Summary {
        summarize(&self.form, self.responses.iter().map(|r| &r.response))
    }

    pub fn tabulate(&self) -> Table {
        tabulate(&self.form, self.responses.iter().map(|r| &r.response))
    }

    /// The CSV export, or [`Error::EmptyResult`] if nobody has responded yet.
    pub fn export_csv(&self) -> Result<Vec<u8>> {
        if self.responses.is_empty() {
            return Err(Error::EmptyResult(format!(
                "No responses found for form '{}'",
                self.form.id
            )));
        }
        Ok(self.tabulate().to_csv()?)
    }
}
