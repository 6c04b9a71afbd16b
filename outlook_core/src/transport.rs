use serde_json::{json, Value};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::error::OutlookError;
use crate::mcp_server::JsonRpcHandler;

/// Newline-delimited JSON-RPC over a reader/writer pair, one request at a time.
pub struct StdioTransport {
    handler: JsonRpcHandler,
}

impl StdioTransport {
    pub fn new(handler: JsonRpcHandler) -> Self {
        Self { handler }
    }

    /// Serves stdin/stdout until stdin closes.
    pub async fn run(&self) -> io::Result<()> {
        info!("starting stdio transport");
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        self.serve(stdin, &mut stdout).await
    }

    pub async fn serve<R, W>(&self, mut reader: R, writer: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                debug!("EOF on input");
                return Ok(());
            }
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.process_line(&line).await {
                write_response(writer, &response).await?;
            }
        }
    }

    async fn process_line(&self, line: &str) -> Option<Value> {
        debug!("processing line: {}", line.trim_end());
        match serde_json::from_str::<Value>(line) {
            Ok(request) => self.handler.handle_request(request).await,
            Err(e) => {
                error!("failed to parse JSON-RPC request: {}", e);
                let mut error = OutlookError::ParseError.to_jsonrpc_error();
                error["data"] = json!(e.to_string());
                Some(json!({
                    "jsonrpc": "2.0",
                    "error": error,
                    "id": null
                }))
            }
        }
    }
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Value) -> io::Result<()> {
    let text = serde_json::to_string(response)?;
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    debug!("sent response: {}", text);
    Ok(())
}
