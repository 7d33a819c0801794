//! Accumulates streamed audio chunks
//!
//! A single consumer task owns the bytes; producers talk to it over a bounded
//! channel, so appends are serialized without a shared lock.

use axum::body::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::{Error, Result};

/// Pending commands for the consumer task
const CHANNEL_CAPACITY: usize = 64;

enum Command {
    Append(Bytes, oneshot::Sender<Result<usize>>),
    Take(oneshot::Sender<Bytes>),
    Len(oneshot::Sender<usize>),
}

/// Handle to the audio accumulation task
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    tx: mpsc::Sender<Command>,
}

impl AudioBuffer {
    /// Spawn the consumer task; appends beyond `max_bytes` are rejected
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(max_bytes: usize) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run(rx, max_bytes));
        Self { tx }
    }

    /// Append a chunk, returning the buffered length afterwards
    ///
    /// # Errors
    ///
    /// Returns error if the chunk would exceed the size limit or the task stopped
    pub async fn append(&self, chunk: Bytes) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Append(chunk, reply)).await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Take everything buffered so far, leaving the buffer empty
    ///
    /// # Errors
    ///
    /// Returns error if the task stopped
    pub async fn take(&self) -> Result<Bytes> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Take(reply)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Number of buffered bytes
    ///
    /// # Errors
    ///
    /// Returns error if the task stopped
    pub async fn buffered(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Len(reply)).await?;
        rx.await.map_err(|_| stopped())
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| stopped())
    }
}

fn stopped() -> Error {
    Error::Audio("audio buffer task stopped".to_string())
}

async fn run(mut rx: mpsc::Receiver<Command>, max_bytes: usize) {
    let mut data: Vec<u8> = Vec::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Append(chunk, reply) => {
                let result = if data.len() + chunk.len() > max_bytes {
                    tracing::warn!(
                        buffered = data.len(),
                        chunk = chunk.len(),
                        max_bytes,
                        "audio buffer full, dropping chunk"
                    );
                    Err(Error::BufferFull { limit: max_bytes })
                } else {
                    data.extend_from_slice(&chunk);
                    Ok(data.len())
                };
                let _ = reply.send(result);
            }
            Command::Take(reply) => {
                let taken = Bytes::from(std::mem::take(&mut data));
                tracing::debug!(bytes = taken.len(), "audio buffer drained");
                let _ = reply.send(taken);
            }
            Command::Len(reply) => {
                let _ = reply.send(data.len());
            }
        }
    }

    tracing::debug!("audio buffer task exiting");
}
