use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

use crate::auth::guards::RequestAccount;

/// Fairing that logs one line per HTTP request with timing and, once the
/// auth guard has run, the caller's account id.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let elapsed = request.local_cache(Instant::now).elapsed();
        let account = match request.local_cache(RequestAccount::default).0 {
            Some(id) => id.to_string(),
            None => "-".to_string(),
        };

        log::info!(
            "{} {} -> {} ({:.2}ms) account={}",
            request.method(),
            request.uri(),
            response.status().code,
            elapsed.as_secs_f64() * 1000.0,
            account
        );
    }
}
