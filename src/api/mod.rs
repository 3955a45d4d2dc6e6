use rocket::{http::Status, response::status::Custom, serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

pub(crate) mod auth;
pub(crate) mod forms;
mod responses;

pub fn routes() -> Vec<Route> {
    let mut routes = routes![welcome];
    routes.extend(auth::routes());
    routes.extend(forms::routes());
    routes.extend(responses::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

#[get("/")]
fn welcome() -> &'static str {
    "Welcome to the feedback collection service!"
}

/// Give errors raised outside a handler, e.g. by request guards or unmatched
/// routes, the same JSON shape as handler errors.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> Custom<Json<ErrorBody>> {
    let message = status.reason().unwrap_or("Unknown error").to_string();
    Custom(status, Json(ErrorBody { message }))
}
