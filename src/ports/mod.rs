// Ports - Interface definitions (contracts)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::model::*;
use crate::error::TranscodeResult;

/// Port for the remote transcoding backend
///
/// Pushes must be issued one at a time in sequence order; the backend
/// associates output with in-order submission.
#[async_trait]
pub trait TranscodePort: Send + Sync {
    /// Create a remote stream for the given renditions
    async fn create_session(&self, name: &str, renditions: &RenditionSet) -> TranscodeResult<Session>;

    /// Submit one input segment and collect one buffer per rendition
    async fn push_segment(
        &self,
        session: &Session,
        seq_no: u64,
        duration: Duration,
        payload: Bytes,
    ) -> TranscodeResult<TranscodedSegmentSet>;

    /// Release the remote stream
    async fn delete_session(&self, session: &Session) -> TranscodeResult<()>;
}

/// Port for the producer that slices the input into segments
pub trait SegmentSource: Send + Sync {
    /// Start producing segments into a bounded channel
    ///
    /// The producer stops once `cancel` fires or the receiver is dropped. The
    /// stream always ends with [`SegmentEvent::End`] or
    /// [`SegmentEvent::Failed`] unless the consumer went away first.
    fn start(
        &self,
        input: &Path,
        segment_length: Duration,
        cancel: CancellationToken,
    ) -> TranscodeResult<mpsc::Receiver<SegmentEvent>>;
}

/// A container file receiving the packets of one rendition
pub trait ContainerSink: Send {
    /// Demux `segment` and append its packets, writing the container header
    /// from the segment's streams first when `write_header` is set
    ///
    /// Returns the number of packets copied.
    fn write_segment(&mut self, segment: &[u8], write_header: bool) -> TranscodeResult<u64>;

    /// Finish the file (trailer, flush)
    fn close(self: Box<Self>) -> TranscodeResult<()>;
}

/// Opens container sinks for container-mode output
pub trait ContainerSinkFactory: Send + Sync {
    fn create(&self, path: &Path) -> TranscodeResult<Box<dyn ContainerSink>>;
}
