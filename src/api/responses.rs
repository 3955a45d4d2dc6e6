use rocket::{
    http::{Header, Status},
    response::status::Custom,
    serde::json::Json,
    Route,
};

use crate::{
    error::{Error, Result},
    logging::RequestId,
    model::{
        api::{
            auth::AuthToken,
            report::{SummaryDescription, TableDescription},
            response::{FormResponses, ResponseReceipt, ResponseSpec},
        },
        db::{
            form::Form,
            response::{NewResponse, Response},
        },
        mongodb::{Coll, Id},
        report::FormReport,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        submit_response,
        form_responses,
        form_summary,
        form_table,
        export_csv,
    ]
}

/// A CSV file download.
#[derive(Responder)]
#[response(content_type = "text/csv")]
pub struct CsvFile {
    body: Vec<u8>,
    disposition: Header<'static>,
}

impl CsvFile {
    pub fn attachment(filename: &str, body: Vec<u8>) -> Self {
        Self {
            body,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{filename}\""),
            ),
        }
    }
}

/// Anonymous submission to a form; no sign-in needed.
#[post("/forms/<form_id>/responses", data = "<spec>", format = "json")]
pub async fn submit_response(
    form_id: Id,
    spec: Json<ResponseSpec>,
    forms: Coll<Form>,
    new_responses: Coll<NewResponse>,
    req_id: &RequestId,
) -> Result<Custom<Json<ResponseReceipt>>> {
    let form = Form::fetch(&forms, form_id).await?;
    let response = spec.0.into_response(&form)?;
    let id: Id = new_responses
        .insert_one(&response, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                "Database returned a non-ObjectId key".to_string(),
            )
        })?
        .into();
    debug!(
        "  req{req_id} stored response {id} with {} answer(s) to form {form_id}",
        response.answers.len()
    );

    let receipt = ResponseReceipt {
        id: id.into(),
        submitted_at: response.submitted_at,
    };
    Ok(Custom(Status::Created, Json(receipt)))
}

/// Everything stored for a form: the definition plus raw responses, oldest first.
#[get("/forms/<form_id>/responses")]
pub async fn form_responses(
    _token: AuthToken,
    form_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<FormResponses>> {
    let report = FormReport::load(&forms, &responses, form_id).await?;
    Ok(Json(FormResponses {
        form: report.form.into(),
        responses: report.responses.into_iter().map(Into::into).collect(),
    }))
}

#[get("/forms/<form_id>/summary")]
pub async fn form_summary(
    _token: AuthToken,
    form_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<SummaryDescription>> {
    let report = FormReport::load(&forms, &responses, form_id).await?;
    Ok(Json(SummaryDescription::from(&report)))
}

#[get("/forms/<form_id>/table")]
pub async fn form_table(
    _token: AuthToken,
    form_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<TableDescription>> {
    let report = FormReport::load(&forms, &responses, form_id).await?;
    Ok(Json(TableDescription::from(&report)))
}

#[get("/forms/<form_id>/export")]
pub async fn export_csv(
    _token: AuthToken,
    form_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<CsvFile> {
    let report = FormReport::load(&forms, &responses, form_id).await?;
    let csv = report.export_csv()?;
    info!(
        "Exported {} response(s) from form {form_id}",
        report.responses.len()
    );
    Ok(CsvFile::attachment(
        &format!("form_{form_id}_responses.csv"),
        csv,
    ))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::{serde_json, serde_json::json, Value},
    };

    use crate::error::ErrorBody;
    use crate::model::{
        api::form::{FormCreated, FormDescription, FormSpec},
        common::answer::AnswerValue,
        report::table::SUBMITTED_AT_COLUMN,
    };

    use super::*;

    #[backend_test]
    async fn submit_unknown_form(client: Client) {
        submit_expect_status(&client, Id::new(), json!({"answers": []}), Status::NotFound).await;
    }

    #[backend_test(admin)]
    async fn submit_valid(client: Client, responses: Coll<Response>) {
        let form = create_form(&client).await;
        let q1 = form.questions[0].id.to_string();
        let q3 = form.questions[2].id.to_string();

        // Respondents don't need to be signed in.
        client.post("/auth/logout").dispatch().await;
        let body = json!({
            "answers": [
                {"question_id": q1, "value": "Yes"},
                {"question_id": q3, "value": ["Definitely", "Maybe"]},
            ]
        });
        let response = submit_expect_status(&client, *form.id, body, Status::Created).await;
        let receipt: ResponseReceipt = response.into_json().await.unwrap();

        let stored = responses
            .find_one(receipt.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.form_id, *form.id);
        assert_eq!(stored.submitted_at, receipt.submitted_at);
        assert_eq!(
            stored.answer(*form.questions[2].id),
            Some(&AnswerValue::from(vec!["Definitely", "Maybe"]))
        );
    }

    #[backend_test(admin)]
    async fn submit_invalid(client: Client, responses: Coll<Response>) {
        let form = create_form(&client).await;
        let q1 = form.questions[0].id.to_string();

        // Foreign question.
        let body = json!({"answers": [{"question_id": Id::new().to_string(), "value": "Yes"}]});
        let response = submit_expect_status(&client, *form.id, body, Status::BadRequest).await;
        let error: ErrorBody = response.into_json().await.unwrap();
        assert!(error.message.contains("does not belong"));

        // Same question twice.
        let body = json!({"answers": [
            {"question_id": q1, "value": "Yes"},
            {"question_id": q1, "value": "No"},
        ]});
        submit_expect_status(&client, *form.id, body, Status::BadRequest).await;

        // Blank answer.
        let body = json!({"answers": [{"question_id": q1, "value": " "}]});
        submit_expect_status(&client, *form.id, body, Status::BadRequest).await;
        let body = json!({"answers": [{"question_id": q1, "value": ["", "Yes"]}]});
        submit_expect_status(&client, *form.id, body, Status::BadRequest).await;

        // Nothing answered.
        submit_expect_status(&client, *form.id, json!({"answers": []}), Status::BadRequest).await;

        assert_eq!(responses.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(admin)]
    async fn summary_counts(client: Client) {
        let form = create_form(&client).await;
        for answer in ["Yes", "Yes", "No"] {
            submit_answer(&client, &form, 0, answer).await;
        }
        // Not an option, so not counted.
        submit_answer(&client, &form, 0, "Perhaps").await;

        let response = client.get(uri!(form_summary(*form.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let summary: SummaryDescription = response.into_json().await.unwrap();

        assert_eq!(summary.total_responses, 4);
        // The text question is absent.
        assert_eq!(summary.questions.len(), 2);
        let enjoyed = summary.questions[0]
            .options
            .iter()
            .map(|o| (o.option.as_str(), o.count, o.percentage))
            .collect::<Vec<_>>();
        assert_eq!(enjoyed, vec![("Yes", 2, 67), ("No", 1, 33)]);
        let again = summary.questions[1]
            .options
            .iter()
            .map(|o| (o.option.as_str(), o.count, o.percentage))
            .collect::<Vec<_>>();
        assert_eq!(
            again,
            vec![("Definitely", 0, 0), ("Maybe", 0, 0), ("No", 0, 0)]
        );

        let enjoyed = summary.counts.get(*form.questions[0].id).unwrap();
        assert_eq!(enjoyed.get("Yes"), Some(2));
        assert_eq!(enjoyed.get("Perhaps"), None);
        assert!(summary.counts.get(*form.questions[1].id).is_none());
    }

    #[backend_test(admin)]
    async fn summary_without_responses(client: Client) {
        let form = create_form(&client).await;
        let response = client.get(uri!(form_summary(*form.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let summary: SummaryDescription = response.into_json().await.unwrap();
        assert_eq!(summary.total_responses, 0);
        assert!(summary
            .questions
            .iter()
            .flat_map(|q| &q.options)
            .all(|o| o.count == 0 && o.percentage == 0));
    }

    #[backend_test(admin)]
    async fn table_rows(client: Client) {
        let form = create_form(&client).await;
        submit_answer(&client, &form, 1, "The keynote").await;
        submit_answer(&client, &form, 0, "No").await;

        let response = client.get(uri!(form_table(*form.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let table: TableDescription = response.into_json().await.unwrap();

        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells, vec!["-", "The keynote", "-"]);
        assert_eq!(table.rows[1].cells, vec!["No", "-", "-"]);
        assert!(table.rows[0].submitted_at <= table.rows[1].submitted_at);
    }

    #[backend_test(admin)]
    async fn dump_responses(client: Client) {
        let form = create_form(&client).await;
        submit_answer(&client, &form, 0, "Yes").await;

        let response = client.get(uri!(form_responses(*form.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let dump: FormResponses = response.into_json().await.unwrap();
        assert_eq!(dump.form, form);
        assert_eq!(dump.responses.len(), 1);
        assert_eq!(dump.responses[0].answers[0].value, AnswerValue::from("Yes"));
    }

    #[backend_test(admin)]
    async fn export(client: Client) {
        let form = create_form(&client).await;

        // Nothing to export yet.
        let response = client.get(uri!(export_csv(*form.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let error: ErrorBody = response.into_json().await.unwrap();
        assert!(error.message.starts_with("No responses found"));

        submit_answer(&client, &form, 1, "Loved it, \"all\" of it").await;
        submit_answer(&client, &form, 0, "Yes").await;

        let response = client.get(uri!(export_csv(*form.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            response.headers().get_one("Content-Disposition"),
            Some(format!("attachment; filename=\"form_{}_responses.csv\"", form.id).as_str())
        );
        assert_eq!(response.content_type().map(|ct| ct.sub().to_string()), Some("csv".to_string()));

        let body = response.into_bytes().await.unwrap();
        let mut reader = csv::Reader::from_reader(body.as_slice());
        let header = reader.headers().unwrap().clone();
        let expected_header = std::iter::once(SUBMITTED_AT_COLUMN.to_string())
            .chain(form.questions.iter().map(|q| q.id.to_string()))
            .collect::<Vec<_>>();
        assert_eq!(header.iter().collect::<Vec<_>>(), expected_header);

        let records = reader.records().map(|r| r.unwrap()).collect::<Vec<_>>();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][2], "Loved it, \"all\" of it");
        assert_eq!(&records[0][1], "");
        assert_eq!(&records[1][1], "Yes");
    }

    #[backend_test]
    async fn reports_require_admin(client: Client) {
        let id = Id::new();
        for uri in [
            uri!(form_responses(id)),
            uri!(form_summary(id)),
            uri!(form_table(id)),
            uri!(export_csv(id)),
        ] {
            let response = client.get(uri).dispatch().await;
            assert_eq!(Status::Unauthorized, response.status());
            let error: Value = response.into_json().await.unwrap();
            assert!(error["message"].is_string());
        }
    }

    #[backend_test(admin)]
    async fn reports_for_missing_form(client: Client, forms: Coll<Form>) {
        let id = Id::new();
        assert!(forms.find_one(doc! {"_id": id}, None).await.unwrap().is_none());
        for uri in [
            uri!(form_responses(id)),
            uri!(form_summary(id)),
            uri!(form_table(id)),
            uri!(export_csv(id)),
        ] {
            let response = client.get(uri).dispatch().await;
            assert_eq!(Status::NotFound, response.status());
        }
    }

    async fn create_form(client: &Client) -> FormDescription {
        let response = client
            .post("/forms")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&FormSpec::example()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let created: FormCreated = response.into_json().await.unwrap();
        created.form
    }

    /// Submit a response answering only the `index`th question.
    async fn submit_answer(client: &Client, form: &FormDescription, index: usize, value: &str) {
        let body = json!({
            "answers": [{"question_id": form.questions[index].id.to_string(), "value": value}]
        });
        submit_expect_status(client, *form.id, body, Status::Created).await;
    }

    async fn submit_expect_status<'c>(
        client: &'c Client,
        form_id: Id,
        body: Value,
        status: Status,
    ) -> LocalResponse<'c> {
        let response = client
            .post(uri!(submit_response(form_id)))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        assert_eq!(status, response.status());
        response
    }
}
