//! JSON catchers so guard failures and unmatched routes share the
//! `{error, message}` body of [`crate::error::ApiError`].

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Catcher, Request, catch, catchers};

use crate::error::ErrorResponse;

#[catch(default)]
fn default_catcher(status: Status, request: &Request<'_>) -> status::Custom<Json<ErrorResponse>> {
    log::debug!("{} {} caught with {}", request.method(), request.uri(), status.code);
    let (error, message) = match status.code {
        400 => ("BadRequest", "The request could not be understood"),
        401 => ("Unauthorized", "Authentication required"),
        403 => ("Forbidden", "Admin role required"),
        404 => ("NotFound", "Resource not found"),
        422 => ("BadRequest", "The request body is not valid"),
        code if code >= 500 => ("InternalError", "An internal error occurred"),
        _ => ("Error", status.reason_lossy()),
    };
    status::Custom(status, Json(ErrorResponse::new(error, message)))
}

pub fn all() -> Vec<Catcher> {
    catchers![default_catcher]
}
