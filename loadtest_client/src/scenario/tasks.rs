use rand::Rng;
use std::time::Instant;
use tracing::{debug, error};

use super::fixture::UserFixture;
use super::{TaskOutcome, TaskResult};
use crate::response::{CatchResponse, RequestOutcome};
use crate::session::{HttpSession, MultipartFile};
use crate::TaskError;

pub const HELLO_WORLD: &str = "Hello World";
pub const FILE_UPLOAD: &str = "File Upload";
pub const SEARCH_BY_LOCATION: &str = "Search by Location";

pub const UPLOAD_PATH: &str = "/api/upload";
pub const SEARCH_PATH: &str = "/api/search";

/// GET / and expect 200.
pub async fn hello_world(session: &dyn HttpSession) -> TaskResult {
    let started = Instant::now();
    let reply = session.get("/").await?;
    let resp = CatchResponse::new(HELLO_WORLD, reply, started.elapsed());

    let outcome = if resp.status_code() == 200 {
        resp.success()
    } else {
        let status = resp.status_code();
        resp.failure(format!("Failed with status {}", status))
    };
    Ok(TaskOutcome::Reported(outcome))
}

/// POST the fixture file as multipart field `file`.
///
/// Skipped for the user's lifetime when the fixture was missing at startup.
/// Any error while reading the file or sending the request is logged and
/// swallowed so the user keeps cycling.
pub async fn upload_file(session: &dyn HttpSession, fixture: &UserFixture) -> TaskResult {
    if !fixture.file_exists() {
        return Ok(TaskOutcome::Skipped);
    }

    match send_upload(session, fixture).await {
        Ok(outcome) => Ok(TaskOutcome::Reported(outcome)),
        Err(e) => {
            error!(
                error = ?e,
                path = %fixture.upload_file_path().display(),
                "File upload error"
            );
            Ok(TaskOutcome::Isolated {
                name: FILE_UPLOAD,
                reason: e.to_string(),
            })
        }
    }
}

async fn send_upload(
    session: &dyn HttpSession,
    fixture: &UserFixture,
) -> Result<RequestOutcome, TaskError> {
    let bytes = tokio::fs::read(fixture.upload_file_path()).await?;
    let file = MultipartFile {
        field: "file".to_string(),
        file_name: "data.txt".to_string(),
        content_type: "text/plain".to_string(),
        bytes,
    };

    let started = Instant::now();
    let reply = session.post_multipart(UPLOAD_PATH, file).await?;
    let resp = CatchResponse::new(FILE_UPLOAD, reply, started.elapsed());

    let outcome = match resp.status_code() {
        200 | 201 | 202 => resp.success(),
        status => resp.failure(format!("Upload failed: {}", status)),
    };
    Ok(outcome)
}

/// GET /api/search for one location picked uniformly from the candidates.
pub async fn get_platform_by_location<R: Rng + Send + ?Sized>(
    session: &dyn HttpSession,
    fixture: &UserFixture,
    rng: &mut R,
) -> TaskResult {
    let location = fixture.pick_location(rng).to_string();
    let path = format!("{}?location={}", SEARCH_PATH, location);
    debug!("searching platforms for {}", location);

    let started = Instant::now();
    let reply = session.get(&path).await?;
    let resp = CatchResponse::new(SEARCH_BY_LOCATION, reply, started.elapsed());

    let outcome = if resp.status_code() == 200 {
        resp.success()
    } else {
        let status = resp.status_code();
        resp.failure(format!("Search failed for {}: {}", location, status))
    };
    Ok(TaskOutcome::Reported(outcome))
}
