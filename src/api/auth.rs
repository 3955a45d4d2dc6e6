use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            admin::{normalize_email, AdminDescription, LoginRequest, SignupRequest},
            auth::{AuthToken, AUTH_TOKEN_COOKIE},
        },
        db::admin::{Admin, NewAdmin},
        mongodb::{is_duplicate_key_error, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![signup, login, logout]
}

#[post("/auth/signup", data = "<request>", format = "json")]
pub async fn signup(
    cookies: &CookieJar<'_>,
    request: Json<SignupRequest>,
    new_admins: Coll<NewAdmin>,
    config: &State<Config>,
) -> Result<Json<AdminDescription>> {
    let admin: NewAdmin = request.0.try_into()?;

    // The unique index on `email` rejects duplicates, even under concurrent sign-ups.
    let inserted = match new_admins.insert_one(&admin, None).await {
        Ok(result) => result,
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::Status(
                Status::Conflict,
                format!("An admin with email '{}' already exists", admin.email),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    let id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                "Database returned a non-ObjectId key".to_string(),
            )
        })?
        .into();
    let admin = Admin { id, admin };
    info!("Registered admin {} <{}>", admin.id, admin.email);

    cookies.add(AuthToken::new(&admin).into_cookie(config)?);
    Ok(Json(admin.into()))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginRequest>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<Json<AdminDescription>> {
    let with_email = doc! {
        "email": normalize_email(&credentials.email),
    };

    let admin = match admins.find_one(with_email, None).await? {
        Some(admin) if admin.verify_password(&credentials.password)? => admin,
        _ => {
            return Err(Error::Status(
                Status::BadRequest,
                "No admin found with the provided email and password combination.".to_string(),
            ))
        }
    };

    cookies.add(AuthToken::new(&admin).into_cookie(config)?);
    Ok(Json(admin.into()))
}

#[post("/auth/logout")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
