use mongodb::{bson::doc, options::FindOptions};
use rocket::{
    futures::TryStreamExt, http::Status, response::status::Custom, serde::json::Json, Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            form::{FormCreated, FormDescription, FormSpec},
        },
        db::form::{Form, NewForm},
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create_form, list_forms, get_form]
}

#[post("/forms", data = "<spec>", format = "json")]
pub async fn create_form(
    token: AuthToken,
    spec: Json<FormSpec>,
    new_forms: Coll<NewForm>,
    config: &State<Config>,
) -> Result<Custom<Json<FormCreated>>> {
    let form = spec.0.into_form(token.id)?;
    let id: Id = new_forms
        .insert_one(&form, None)
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
    info!(
        "Admin {} created form {} with {} questions",
        token.id,
        id,
        form.questions.len()
    );

    let created = FormCreated {
        public_url: config.form_url(id),
        form: Form { id, form }.into(),
    };
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/forms")]
pub async fn list_forms(_token: AuthToken, forms: Coll<Form>) -> Result<Json<Vec<FormDescription>>> {
    let options = FindOptions::builder()
        .sort(doc! {"created_at": 1, "_id": 1})
        .build();
    let forms: Vec<FormDescription> = forms
        .find(None, options)
        .await?
        .map_ok(FormDescription::from)
        .try_collect()
        .await?;
    Ok(Json(forms))
}

/// The public view of a form, for respondents.
#[get("/forms/<form_id>")]
pub async fn get_form(form_id: Id, forms: Coll<Form>) -> Result<Json<FormDescription>> {
    let form = Form::fetch(&forms, form_id).await?;
    Ok(Json(form.into()))
}
