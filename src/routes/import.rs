//! Admin bulk import endpoints.
//!
//! Every handler takes its guards as `Result`s so the response order is
//! fixed: authentication (401), authorization (403), then the body (400).

use std::io::Cursor;

use rocket::http::{ContentType, Header, Status};
use rocket::response::{self, Responder, status};
use rocket::serde::json::{self, Json};
use rocket::{Request, Response, State};
use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::openapi;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, AuthState, RequireAdmin};
use crate::error::ApiError;
use crate::import::{
    ImportConfig, ImportContext, ImportKind, ImportOptions, ImportOutcome, Row, ValidationReport,
    csv, run_import, schema, templates,
};
use crate::store::SharedStore;

type AdminGuard = Result<RequireAdmin, AuthError>;
type Body<'r, T> = Result<Json<T>, json::Error<'r>>;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImportRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<Row>,
    #[serde(default)]
    pub options: ImportOptions,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CsvImportRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub csv: String,
    #[serde(default)]
    pub options: ImportOptions,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<Row>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PreviewRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub csv: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PreviewResponse {
    pub rows: Vec<Row>,
    pub validation: ValidationReport,
}

/// Import already-parsed rows.
#[openapi(tag = "Import")]
#[post("/admin/import", data = "<payload>")]
pub async fn import_rows(
    admin: AdminGuard,
    store: &State<SharedStore>,
    auth: &State<AuthState>,
    limits: &State<ImportConfig>,
    payload: Body<'_, ImportRequest>,
) -> Result<status::Custom<Json<ImportOutcome>>, ApiError> {
    let RequireAdmin(user) = admin?;
    let Json(request) = payload.map_err(malformed_body)?;
    let kind: ImportKind = request.kind.parse()?;
    check_row_limit(limits, request.data.len())?;

    log::info!("account {} importing {} {} rows", user.id, request.data.len(), kind);
    execute(store, auth, kind, &request.data, request.options).await
}

/// Parse CSV text and import the resulting rows.
#[openapi(tag = "Import")]
#[post("/admin/import/csv", data = "<payload>")]
pub async fn import_csv(
    admin: AdminGuard,
    store: &State<SharedStore>,
    auth: &State<AuthState>,
    limits: &State<ImportConfig>,
    payload: Body<'_, CsvImportRequest>,
) -> Result<status::Custom<Json<ImportOutcome>>, ApiError> {
    let RequireAdmin(user) = admin?;
    let Json(request) = payload.map_err(malformed_body)?;
    let kind: ImportKind = request.kind.parse()?;
    let rows = csv::parse_for(kind, &request.csv);
    check_row_limit(limits, rows.len())?;

    log::info!("account {} importing {} {} rows from csv", user.id, rows.len(), kind);
    execute(store, auth, kind, &rows, request.options).await
}

/// Advisory required-field check. Nothing is written.
#[openapi(tag = "Import")]
#[post("/admin/import/validate", data = "<payload>")]
pub async fn validate_rows(
    admin: AdminGuard,
    payload: Body<'_, ValidateRequest>,
) -> Result<Json<ValidationReport>, ApiError> {
    admin?;
    let Json(request) = payload.map_err(malformed_body)?;
    let kind: ImportKind = request.kind.parse()?;
    Ok(Json(schema::validate(kind, &request.data)))
}

/// Parse CSV text and run the advisory check on it. Nothing is written.
#[openapi(tag = "Import")]
#[post("/admin/import/preview", data = "<payload>")]
pub async fn preview_csv(
    admin: AdminGuard,
    limits: &State<ImportConfig>,
    payload: Body<'_, PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    admin?;
    let Json(request) = payload.map_err(malformed_body)?;
    let kind: ImportKind = request.kind.parse()?;
    let rows = csv::parse_for(kind, &request.csv);
    check_row_limit(limits, rows.len())?;

    let validation = schema::validate(kind, &rows);
    Ok(Json(PreviewResponse { rows, validation }))
}

/// Download the CSV template for an import type.
#[openapi(tag = "Import")]
#[get("/admin/import/templates/<kind>")]
pub async fn download_template(admin: AdminGuard, kind: &str) -> Result<CsvAttachment, ApiError> {
    admin?;
    let kind: ImportKind = kind.parse()?;
    let body = templates::template_csv(kind)
        .map_err(|err| ApiError::InternalError(format!("template rendering failed: {err}")))?;

    Ok(CsvAttachment {
        filename: templates::template_filename(kind),
        body,
    })
}

async fn execute(
    store: &State<SharedStore>,
    auth: &State<AuthState>,
    kind: ImportKind,
    rows: &[Row],
    options: ImportOptions,
) -> Result<status::Custom<Json<ImportOutcome>>, ApiError> {
    let ctx = ImportContext::new(store.inner().as_ref(), auth.password_service.as_ref(), options);
    let outcome = run_import(&ctx, kind, rows).await?;
    Ok(status::Custom(outcome.status(options), Json(outcome)))
}

fn check_row_limit(limits: &ImportConfig, rows: usize) -> Result<(), ApiError> {
    if rows > limits.max_rows {
        return Err(ApiError::BadRequest(format!(
            "{rows} rows exceed the limit of {} per import",
            limits.max_rows
        )));
    }
    Ok(())
}

fn malformed_body(err: json::Error<'_>) -> ApiError {
    match err {
        // Rocket reports a body cut off at `limits.json` as an unexpected EOF.
        json::Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            ApiError::BadRequest("request body exceeds the size limit".to_string())
        }
        err => ApiError::BadRequest(format!("malformed request body: {err}")),
    }
}

/// CSV body served as a file download.
pub struct CsvAttachment {
    pub filename: String,
    pub body: String,
}

impl<'r> Responder<'r, 'static> for CsvAttachment {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        Response::build()
            .status(Status::Ok)
            .header(ContentType::CSV)
            .header(Header::new("Content-Disposition", disposition))
            .sized_body(self.body.len(), Cursor::new(self.body))
            .ok()
    }
}

impl OpenApiResponderInner for CsvAttachment {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = ApiError::responses(generator)?;
        responses.responses.insert(
            "200".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "CSV template with a header row and one example row".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}
