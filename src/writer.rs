//! Writer task owning the write half of the service socket.
//!
//! Calls from any number of tasks funnel through one mpsc channel into a
//! single task that batches whatever is queued into one vectored write:
//!
//! ```text
//! register ─┐
//! request  ─┼─► WriterHandle ─► writer task ─► socket
//! call     ─┘
//! ```
//!
//! In-flight frames are bounded by a semaphore; a sender that cannot get a
//! permit within the backpressure timeout fails with
//! [`ExtPhoneError::BackpressureTimeout`].

use std::io::IoSlice;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::error::{ExtPhoneError, Result};
use crate::protocol::{checked_payload_length, Header, HEADER_SIZE};

/// Default cap on frames queued but not yet written.
pub const DEFAULT_MAX_PENDING_FRAMES: usize = 256;

/// Default writer channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default wait for a pending-frame slot.
pub const DEFAULT_BACKPRESSURE_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_BATCH_SIZE: usize = 32;

/// A frame ready for the socket.
#[derive(Debug)]
pub struct OutboundFrame {
    header: [u8; HEADER_SIZE],
    payload: Bytes,
}

impl OutboundFrame {
    /// Frame `payload` under `header`; the length field is taken from the payload.
    pub fn new(header: &Header, payload: Bytes) -> Result<Self> {
        let header = Header {
            payload_length: checked_payload_length(payload.len(), u32::MAX)?,
            ..*header
        };
        Ok(Self {
            header: header.encode(),
            payload,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Writer task tuning.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub max_pending_frames: usize,
    pub channel_capacity: usize,
    pub backpressure_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_pending_frames: DEFAULT_MAX_PENDING_FRAMES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            backpressure_timeout: DEFAULT_BACKPRESSURE_TIMEOUT,
        }
    }
}

type Queued = (OutboundFrame, OwnedSemaphorePermit);

/// Cloneable sender side of the writer task.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Queued>,
    slots: Arc<Semaphore>,
    max_pending: usize,
    timeout: Duration,
}

impl WriterHandle {
    /// Queue a frame, waiting for a pending slot if the writer is behind.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        let permit = tokio::time::timeout(self.timeout, self.slots.clone().acquire_owned())
            .await
            .map_err(|_| ExtPhoneError::BackpressureTimeout)?
            .map_err(|_| ExtPhoneError::ConnectionClosed)?;

        self.tx
            .send((frame, permit))
            .await
            .map_err(|_| ExtPhoneError::ConnectionClosed)
    }

    /// Frames queued but not yet written.
    pub fn pending_count(&self) -> usize {
        self.max_pending - self.slots.available_permits()
    }
}

/// Spawn the writer task over `writer`.
///
/// The task ends cleanly once every [`WriterHandle`] is dropped, or with
/// the first I/O error.
pub fn spawn_writer_task<W>(
    writer: W,
    config: WriterConfig,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let max_pending = config.max_pending_frames.max(1);
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let handle = WriterHandle {
        tx,
        slots: Arc::new(Semaphore::new(max_pending)),
        max_pending,
        timeout: config.backpressure_timeout,
    };
    let task = tokio::spawn(writer_loop(rx, writer));
    (handle, task)
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<Queued>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
    while let Some(first) = rx.recv().await {
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(queued) => batch.push(queued),
                Err(_) => break,
            }
        }

        let result = write_batch(&mut writer, &batch).await;
        // permits go back with the frames
        batch.clear();
        if let Err(e) = result {
            tracing::warn!(error = %e, "service socket write failed");
            return Err(e);
        }
    }
    Ok(())
}

async fn write_batch<W>(writer: &mut W, batch: &[Queued]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let total: usize = batch.iter().map(|(frame, _)| frame.size()).sum();

    let mut slices = Vec::with_capacity(batch.len() * 2);
    for (frame, _) in batch {
        slices.push(IoSlice::new(&frame.header));
        if !frame.payload.is_empty() {
            slices.push(IoSlice::new(&frame.payload));
        }
    }

    let written = writer.write_vectored(&slices).await?;
    if written == 0 && total > 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            "socket accepted no bytes",
        )
        .into());
    }

    if written < total {
        // Rare partial write: finish from a contiguous copy of the tail.
        let mut rest = Vec::with_capacity(total - written);
        for (frame, _) in batch {
            rest.extend_from_slice(&frame.header);
            rest.extend_from_slice(&frame.payload);
        }
        writer.write_all(&rest[written..]).await?;
    }

    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameBuffer;
    use tokio::io::{duplex, AsyncReadExt};

    #[test]
    fn test_outbound_frame_length_from_payload() {
        let frame = OutboundFrame::new(&Header::call(42, 0), Bytes::from_static(b"hello")).unwrap();
        assert_eq!(frame.size(), HEADER_SIZE + 5);
        assert_eq!(Header::decode(&frame.header).unwrap().payload_length, 5);
    }

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let (client, mut server) = duplex(4096);
        let (handle, _task) = spawn_writer_task(client, WriterConfig::default());

        for i in 1..=10u32 {
            let payload = Bytes::copy_from_slice(&i.to_be_bytes());
            let frame = OutboundFrame::new(&Header::call(i, 0), payload).unwrap();
            handle.send(frame).await.unwrap();
        }

        let mut frames = Vec::new();
        let mut buffer = FrameBuffer::new();
        let mut buf = vec![0u8; 1024];
        while frames.len() < 10 {
            let n = server.read(&mut buf).await.unwrap();
            frames.extend(buffer.push(&buf[..n]).unwrap());
        }

        let ids: Vec<u32> = frames.iter().map(|f| f.call_id()).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_backpressure_times_out_when_writer_stalls() {
        // Nobody reads the far end, so the duplex fills and the writer blocks.
        let (client, _server) = duplex(16);
        let config = WriterConfig {
            max_pending_frames: 2,
            channel_capacity: 8,
            backpressure_timeout: Duration::from_millis(50),
        };
        let (handle, _task) = spawn_writer_task(client, config);

        let big = Bytes::from(vec![0u8; 256]);
        let mut outcome = Ok(());
        for i in 1..=4u32 {
            let frame = OutboundFrame::new(&Header::call(i, 0), big.clone()).unwrap();
            outcome = handle.send(frame).await;
            if outcome.is_err() {
                break;
            }
        }
        assert!(matches!(outcome, Err(ExtPhoneError::BackpressureTimeout)));
    }

    #[tokio::test]
    async fn test_writer_stops_when_handles_dropped() {
        let (client, _server) = duplex(64);
        let (handle, task) = spawn_writer_task(client, WriterConfig::default());
        drop(handle);
        assert!(task.await.unwrap().is_ok());
    }
}
