//! JSON-RPC 2.0 line protocol over stdio.
//!
//! Requests arrive one per line on stdin. Responses and `navigate`
//! notifications are written one per line on stdout.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{handle_method, SharedState};
use crate::error::ServerResult;
use crate::history::NavigateRequest;

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod rpc_tests;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null if it could not be determined).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
}

/// JSON-RPC 2.0 notification sent by the server.
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<T> {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Notification method.
    pub method: String,
    /// Notification payload.
    pub params: T,
}

/// Server identification returned by `initialize`.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// The server name identifier.
    pub name: String,
    /// The server version string.
    pub version: String,
    /// Name of the event that triggers back navigation.
    pub back_event: String,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

impl JsonRpcNotification<NavigateRequest> {
    /// Wrap a navigate request for the flow engine.
    pub fn navigate(request: NavigateRequest) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: "navigate".to_string(),
            params: request,
        }
    }
}

/// History server running over stdio.
pub struct HistoryServer {
    /// Shared application state.
    state: SharedState,
    /// Navigate requests published by the history.
    navigations: mpsc::UnboundedReceiver<NavigateRequest>,
}

impl HistoryServer {
    /// Create a new server
    pub fn new(state: SharedState, navigations: mpsc::UnboundedReceiver<NavigateRequest>) -> Self {
        Self { state, navigations }
    }

    /// Run the server using async stdio
    pub async fn run(&mut self) -> ServerResult<()> {
        info!("View history server starting...");
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve requests from `reader` until EOF, writing to `writer`
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> ServerResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            for output in self.process_line(&line).await? {
                writer.write_all(output.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            writer.flush().await?;
        }

        Ok(())
    }

    /// Handle one input line and return the output lines it produces.
    ///
    /// Navigate notifications triggered by the line precede its response.
    pub async fn process_line(&mut self, line: &str) -> ServerResult<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        debug!(request = %trimmed, "Received request");

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                Some(JsonRpcResponse::error(
                    None,
                    -32700,
                    format!("Parse error: {}", e),
                ))
            }
        };

        let mut outputs = Vec::new();
        while let Ok(request) = self.navigations.try_recv() {
            let notification = serde_json::to_string(&JsonRpcNotification::navigate(request))?;
            debug!(notification = %notification, "Sending navigate");
            outputs.push(notification);
        }

        // Only send response if not a notification (JSON-RPC 2.0)
        if let Some(response) = response {
            let response_json = serde_json::to_string(&response)?;
            debug!(response = %response_json, "Sending response");
            outputs.push(response_json);
        }

        Ok(outputs)
    }

    /// Handle a single JSON-RPC request
    /// Returns None for notifications (requests without id) as JSON-RPC 2.0 requires
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                -32600,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, Value::Object(Default::default())),
            method => match handle_method(&self.state, method, request.params).await {
                Some(Ok(result)) => JsonRpcResponse::success(request.id, result),
                Some(Err(e)) => {
                    error!(method = %method, error = %e, "Method failed");
                    JsonRpcResponse::error(request.id, e.code(), e.to_string())
                }
                None => {
                    if is_notification {
                        debug!(method = %method, "Unknown notification, ignoring");
                        return None;
                    }
                    error!(method = %method, "Unknown method");
                    JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    )
                }
            },
        };

        if is_notification {
            None
        } else {
            Some(response)
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let info = ServerInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            back_event: self.state.config.history.back_event.clone(),
        };

        match serde_json::to_value(info) {
            Ok(val) => JsonRpcResponse::success(id, serde_json::json!({ "serverInfo": val })),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }
}
