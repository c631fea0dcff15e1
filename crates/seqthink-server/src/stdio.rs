//! Line-delimited stdio transport.
//!
//! One JSON request per input line, one encoded response per output line.
//! Notifications produce no output. Requests are handled in arrival order.

use seqthink_rpc::codec::{encode_response, handle_message};
use seqthink_rpc::context::ServerContext;
use seqthink_rpc::errors::PARSE_ERROR;
use seqthink_rpc::registry::MethodRegistry;
use seqthink_rpc::types::RpcResponse;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::ServerError;

/// Serve requests from `reader` until EOF or cancellation.
pub async fn serve<R, W>(
    reader: R,
    mut writer: W,
    registry: &MethodRegistry,
    ctx: &ServerContext,
    shutdown: CancellationToken,
) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled: u64 = 0;

    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => {
                info!("stdio transport cancelled");
                break;
            }
            next = lines.next_line() => next,
        };

        let response = match next {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                handled += 1;
                handle_message(line, registry, ctx).await
            }
            Ok(None) => break,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(error = %e, "input line is not valid UTF-8");
                let resp = RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"));
                Some(encode_response(&resp))
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(response) = response {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    info!(handled, "stdio transport finished");
    Ok(())
}

/// Serve on the process's stdin and stdout.
pub async fn run(
    registry: &MethodRegistry,
    ctx: &ServerContext,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    info!("running in stdio mode");
    serve(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        registry,
        ctx,
        shutdown,
    )
    .await
}
