use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::Instrument;

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::{Mode, RelayError};

/// `POST /api/lead-upload`
pub async fn lead_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let span = tracing::info_span!("lead_upload", request_id = %request_id(&headers));

    async move {
        let result = match multipart {
            Ok(mut multipart) => state.relay.handle(&mut multipart).await,
            Err(rejection) => {
                tracing::warn!(error = %rejection.body_text(), "Rejected non-multipart request");
                Err(RelayError::Validation(rejection.body_text()))
            }
        };

        match result {
            Ok(response) => {
                metrics::record_request(match state.relay.mode() {
                    Mode::Local => "local",
                    Mode::Forward => "forwarded",
                });
                response
            }
            Err(e) => {
                metrics::record_request(e.outcome());
                if let RelayError::Validation(reason) = &e {
                    tracing::info!(reason = %reason, "Upload rejected");
                }
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}
