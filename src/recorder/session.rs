//! Active recording session
//!
//! A session owns the encoder through a pump task that appends every
//! fragment to a `ChunkBuffer`. Stopping signals the pump, which asks the
//! encoder to flush and drains it to the end of the stream. Whether the
//! drained chunks are kept is the coordinator's call.

use crate::capture::traits::{MediaEncoder, TrackKind};
use crate::utils::error::{AppError, AppResult};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Ordered, append-only sequence of encoded fragments
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    total_len: usize,
}

impl ChunkBuffer {
    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.total_len += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Concatenate all fragments in arrival order
    pub fn finalize(self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.total_len);
        for chunk in self.chunks {
            data.extend_from_slice(&chunk);
        }
        data
    }
}

/// What a finished pump hands back
pub struct SessionOutput {
    pub session_id: Uuid,
    pub tracks: Vec<TrackKind>,
    pub duration_ms: u64,
    pub chunks: ChunkBuffer,
}

/// One running recording
pub struct RecordingSession {
    id: Uuid,
    started: Instant,
    tracks: Vec<TrackKind>,
    stop_tx: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<AppResult<ChunkBuffer>>>,
}

impl RecordingSession {
    /// Start pumping chunks out of `encoder`
    pub fn begin(encoder: Box<dyn MediaEncoder>) -> Self {
        let id = Uuid::new_v4();
        let tracks = encoder.tracks();
        let (stop_tx, stop_rx) = oneshot::channel();
        let pump = tokio::spawn(pump_chunks(id, encoder, stop_rx));

        tracing::info!(session = %id, "Recording session started with tracks {:?}", tracks);

        Self {
            id,
            started: Instant::now(),
            tracks,
            stop_tx: Some(stop_tx),
            pump: Some(pump),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tracks(&self) -> &[TrackKind] {
        &self.tracks
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Stop the encoder and drain it to the end of the stream
    pub async fn finish(mut self) -> AppResult<SessionOutput> {
        let duration_ms = self.elapsed_ms();

        if let Some(stop_tx) = self.stop_tx.take() {
            // The pump may already have ended on its own
            let _ = stop_tx.send(());
        }

        let chunks = match self.pump.take() {
            Some(pump) => pump
                .await
                .map_err(|e| AppError::Encoder(format!("Recording task failed: {}", e)))??,
            None => ChunkBuffer::default(),
        };

        tracing::debug!(
            session = %self.id,
            "Session drained: {} chunks, {} bytes, {}ms",
            chunks.chunk_count(),
            chunks.total_len(),
            duration_ms
        );

        Ok(SessionOutput {
            session_id: self.id,
            tracks: self.tracks.clone(),
            duration_ms,
            chunks,
        })
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn pump_chunks(
    id: Uuid,
    mut encoder: Box<dyn MediaEncoder>,
    mut stop_rx: oneshot::Receiver<()>,
) -> AppResult<ChunkBuffer> {
    let mut chunks = ChunkBuffer::default();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                tracing::debug!(session = %id, "Stop requested, draining encoder");
                encoder.stop().await?;
                while let Some(chunk) = encoder.next_chunk().await? {
                    chunks.push(chunk);
                }
                break;
            }
            next = encoder.next_chunk() => match next? {
                Some(chunk) => chunks.push(chunk),
                None => {
                    tracing::warn!(session = %id, "Encoder ended before stop was requested");
                    break;
                }
            },
        }
    }

    Ok(chunks)
}
