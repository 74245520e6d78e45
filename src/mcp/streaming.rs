//! Streaming tool calls
//!
//! Runs one gateway invocation and reports it as an ordered sequence of
//! events: one `start`, zero or more `chunk`s, then exactly one of `end` or
//! `error`. Events go through a bounded channel so a slow consumer applies
//! backpressure, and a vanished consumer stops production.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use super::gateway::{AdmittedCall, ToolGateway};
use super::protocol::McpError;

pub const DEFAULT_CHUNK_SIZE: usize = 10;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Start {
        tool: String,
        timestamp: String,
    },
    Chunk {
        data: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<Progress>,
    },
    End {
        timestamp: String,
    },
    Error {
        message: String,
        timestamp: String,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End { .. } | StreamEvent::Error { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    NotStarted,
    Streaming,
    Done,
    Errored,
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream consumer disconnected")]
    Disconnected,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Turns tool calls into event streams
#[derive(Debug, Clone, Copy)]
pub struct StreamingEncoder {
    chunk_size: usize,
}

impl Default for StreamingEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl StreamingEncoder {
    /// A chunk size of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Spawns the invocation and returns its events. The backend call itself
    /// is not cancelled if the stream is dropped.
    pub fn stream_tool_call(
        &self,
        gateway: Arc<ToolGateway>,
        name: String,
        arguments: Value,
    ) -> ReceiverStream<StreamEvent> {
        let admission = gateway.admit(&name, arguments);
        self.stream_admission(gateway, name, admission)
    }

    /// Streams a call whose admission was already decided. A rejected call
    /// still produces `start` followed by its `error`.
    pub fn stream_admission(
        &self,
        gateway: Arc<ToolGateway>,
        name: String,
        admission: Result<AdmittedCall, McpError>,
    ) -> ReceiverStream<StreamEvent> {
        self.spawn_producer(gateway, name, admission).0
    }

    fn spawn_producer(
        &self,
        gateway: Arc<ToolGateway>,
        name: String,
        admission: Result<AdmittedCall, McpError>,
    ) -> (ReceiverStream<StreamEvent>, JoinHandle<Result<(), StreamError>>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut producer = Producer {
            tx,
            chunk_size: self.chunk_size,
            state: EncoderState::NotStarted,
        };

        let handle = tokio::spawn(async move {
            let outcome = producer.run(&gateway, &name, admission).await;
            if let Err(e) = &outcome {
                debug!("Stopped streaming {}: {}", name, e);
            }
            outcome
        });

        (ReceiverStream::new(rx), handle)
    }
}

struct Producer {
    tx: mpsc::Sender<StreamEvent>,
    chunk_size: usize,
    state: EncoderState,
}

impl Producer {
    async fn emit(&self, event: StreamEvent) -> Result<(), StreamError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| StreamError::Disconnected)
    }

    async fn run(
        &mut self,
        gateway: &ToolGateway,
        name: &str,
        admission: Result<AdmittedCall, McpError>,
    ) -> Result<(), StreamError> {
        if self.state != EncoderState::NotStarted {
            return Ok(());
        }

        self.state = EncoderState::Streaming;
        self.emit(StreamEvent::Start {
            tool: name.to_string(),
            timestamp: now(),
        })
        .await?;

        let outcome = match admission {
            Ok(call) => gateway.execute(call).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                self.emit_result(result).await?;
                self.state = EncoderState::Done;
                self.emit(StreamEvent::End { timestamp: now() }).await
            }
            Err(e) => {
                self.state = EncoderState::Errored;
                self.emit(StreamEvent::Error {
                    message: e.message(),
                    timestamp: now(),
                })
                .await
            }
        }
    }

    async fn emit_result(&self, mut result: Value) -> Result<(), StreamError> {
        let records = match result.get_mut("records").map(Value::take) {
            Some(Value::Array(records)) => records,
            Some(other) => {
                // Not a record list, put it back and send the result whole.
                result["records"] = other;
                return self.emit_whole(result).await;
            }
            None => return self.emit_whole(result).await,
        };

        let total = records.len();
        let mut sent = 0;
        for window in records.chunks(self.chunk_size) {
            sent += window.len();
            self.emit(StreamEvent::Chunk {
                data: Value::Array(window.to_vec()),
                progress: Some(Progress {
                    current: sent,
                    total,
                }),
            })
            .await?;
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    async fn emit_whole(&self, result: Value) -> Result<(), StreamError> {
        self.emit(StreamEvent::Chunk {
            data: result,
            progress: None,
        })
        .await
    }
}
