//! Server dispatch loop over a line transport.
//!
//! One line in, one line out: each response is written and flushed before
//! the next request is read, so tools run strictly one at a time.

use crate::transport::LineTransport;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio_util::sync::CancellationToken;
use toolgate_application::RequestDispatcher;
use toolgate_domain::{ErrorCode, RequestId, Response, ResponseError, TransportError, encode_response};
use tracing::{debug, info, warn};

/// Counters reported when the loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeReport {
    /// Requests answered (blank lines excluded).
    pub processed: usize,
    /// Requests answered with an error response.
    pub errors: usize,
}

/// Run the dispatch loop until end of input or cancellation.
///
/// Cancellation is observed between requests; a request already being
/// handled is always answered.
pub async fn serve_lines<R, W>(
    reader: R,
    writer: W,
    dispatcher: &RequestDispatcher,
    cancel: CancellationToken,
) -> Result<ServeReport, TransportError>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut transport = LineTransport::new(reader, writer);
    let mut report = ServeReport::default();

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Serve loop cancelled");
                break;
            }
            received = transport.receive() => received,
        };

        let response = match received {
            Ok(Some(line)) => match dispatcher.respond_to_line(&line).await {
                Some(response) => response,
                None => continue,
            },
            Ok(None) => {
                debug!("End of input");
                break;
            }
            Err(TransportError::MalformedMessage(reason)) => {
                warn!("Unreadable request line: {}", reason);
                Response::failure(
                    RequestId::null(),
                    ResponseError::new(ErrorCode::MalformedRequest, reason),
                )
            }
            Err(e) => {
                transport.close().await;
                return Err(e);
            }
        };

        report.processed += 1;
        if !response.is_success() {
            report.errors += 1;
        }
        transport.send(&encode_response(&response)).await?;
    }

    transport.close().await;
    Ok(report)
}

/// Serve on the process's own stdin/stdout.
pub async fn serve_stdio(
    dispatcher: &RequestDispatcher,
    cancel: CancellationToken,
) -> Result<ServeReport, TransportError> {
    info!(
        server = dispatcher.server_info().name.as_str(),
        "Serving tools on stdio"
    );
    let report = serve_lines(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        dispatcher,
        cancel,
    )
    .await?;
    info!(
        processed = report.processed,
        errors = report.errors,
        "Tool server stopped"
    );
    Ok(report)
}
