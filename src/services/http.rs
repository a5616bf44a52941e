use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Errors from the vendor HTTP clients
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            ClientError::InvalidUrl(_) => None,
        }
    }
}

/// Turn a non-success response into `ClientError::Status`, keeping the body text.
pub async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

/// Append path segments to a base URL, percent-encoding each one.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<url::Url, ClientError> {
    let mut url = url::Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
