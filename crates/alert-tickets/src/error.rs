use axum::http::StatusCode;

/// Error is the failure of a reconciliation pass, or of the request which
/// carried it. An unavailable workflow transition is deliberately absent:
/// it's logged and the pass continues with a content update.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported notification version {0:?} (expected \"3\" or \"4\")")]
    UnsupportedVersion(String),
    #[error("malformed notification payload")]
    MalformedPayload(#[source] serde_json::Error),
    #[error("ticket store query '{action}' failed")]
    StoreQuery {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("ticket store mutation '{action}' failed")]
    StoreMutation {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to render ticket content")]
    Render(#[from] handlebars::RenderError),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::UnsupportedVersion(_) | Error::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Error::StoreQuery { .. } | Error::StoreMutation { .. } | Error::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error = format!("{:#}", anyhow::Error::new(self));
        (status, error).into_response()
    }
}
