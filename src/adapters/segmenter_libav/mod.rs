// Libav segmenter adapter - Slices the input into MPEG-TS segments on keyframes

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use ffmpeg_next::format::context::Input;
use ffmpeg_next::{format, media, Packet, Rational};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::mux_libav::{add_copy_streams, init_libav, write_copied_packet};
use crate::domain::model::{InputSegment, SegmentEvent};
use crate::error::{TranscodeError, TranscodeResult};
use crate::ports::SegmentSource;

/// Segments buffered between the producer and the pipeline
const SEGMENT_QUEUE_DEPTH: usize = 1;

/// Segment source that demuxes the input with libav on a blocking thread
pub struct LibavSegmenter {
    queue_depth: usize,
}

impl LibavSegmenter {
    pub fn new() -> TranscodeResult<Self> {
        init_libav()?;
        Ok(Self {
            queue_depth: SEGMENT_QUEUE_DEPTH,
        })
    }
}

impl SegmentSource for LibavSegmenter {
    fn start(
        &self,
        input: &Path,
        segment_length: Duration,
        cancel: CancellationToken,
    ) -> TranscodeResult<mpsc::Receiver<SegmentEvent>> {
        if segment_length.is_zero() {
            return Err(TranscodeError::configuration("Segment length must be positive"));
        }

        let (tx, rx) = mpsc::channel(self.queue_depth);
        let input = input.to_path_buf();

        tokio::task::spawn_blocking(move || run(input, segment_length, tx, cancel));

        Ok(rx)
    }
}

/// How the packet loop ended
enum Flow {
    /// Input exhausted, every segment delivered
    Finished,
    /// Cancelled or the consumer went away
    Stopped,
}

fn run(
    input: PathBuf,
    segment_length: Duration,
    tx: mpsc::Sender<SegmentEvent>,
    cancel: CancellationToken,
) {
    let outcome = Slicer::open(&input, segment_length).and_then(|mut slicer| slicer.run(&tx, &cancel));

    let last = match outcome {
        Ok(Flow::Finished) => SegmentEvent::End,
        Ok(Flow::Stopped) => {
            debug!("Segmenter stopped before end of input");
            return;
        }
        Err(e) => {
            warn!("Segmenting {} failed: {}", input.display(), e);
            let message = match e {
                TranscodeError::Source { message } => message,
                other => other.to_string(),
            };
            SegmentEvent::Failed(message)
        }
    };
    // The consumer may already be gone
    let _ = tx.blocking_send(last);
}

/// Packets of the segment currently being accumulated
struct PendingSegment {
    start: f64,
    end: f64,
    packets: Vec<Packet>,
}

struct Slicer {
    ictx: Input,
    time_bases: Vec<Rational>,
    video_index: Option<usize>,
    segment_secs: f64,
}

impl Slicer {
    fn open(input: &Path, segment_length: Duration) -> TranscodeResult<Self> {
        let ictx = format::input(input).map_err(|e| TranscodeError::Source {
            message: format!("Failed to open input {}: {}", input.display(), e),
        })?;

        let time_bases = ictx.streams().map(|s| s.time_base()).collect();
        let video_index = ictx
            .streams()
            .find(|s| s.parameters().medium() == media::Type::Video)
            .map(|s| s.index());

        info!(
            "Segmenting {} every {:.3}s ({})",
            input.display(),
            segment_length.as_secs_f64(),
            if video_index.is_some() { "keyframe aligned" } else { "audio only" }
        );

        Ok(Self {
            ictx,
            time_bases,
            video_index,
            segment_secs: segment_length.as_secs_f64(),
        })
    }

    fn run(
        &mut self,
        tx: &mpsc::Sender<SegmentEvent>,
        cancel: &CancellationToken,
    ) -> TranscodeResult<Flow> {
        let mut seq_no = 0u64;
        let mut pending: Option<PendingSegment> = None;

        loop {
            if cancel.is_cancelled() {
                return Ok(Flow::Stopped);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => {
                    return Err(TranscodeError::Source {
                        message: format!("Failed to read input packet: {}", e),
                    })
                }
            }

            let index = packet.stream();
            let Some(tb) = self.time_bases.get(index).copied() else {
                continue;
            };
            let seconds = |ts: i64| ts as f64 * f64::from(tb);
            let at = packet.pts().or(packet.dts()).map(seconds);

            let cut_here = match self.video_index {
                Some(video) => index == video && packet.is_key(),
                None => true,
            };

            if let (Some(at), Some(current)) = (at, pending.as_ref()) {
                if cut_here && at - current.start >= self.segment_secs {
                    if let Some(done) = pending.take() {
                        if !self.deliver(seq_no, done, tx)? {
                            return Ok(Flow::Stopped);
                        }
                        seq_no += 1;
                    }
                }
            }

            let segment = pending.get_or_insert_with(|| PendingSegment {
                start: at.unwrap_or(0.0),
                end: at.unwrap_or(0.0),
                packets: Vec::new(),
            });
            if let Some(at) = at {
                segment.end = segment.end.max(at + seconds(packet.duration()));
            }
            segment.packets.push(packet);
        }

        if let Some(last) = pending.take() {
            if !self.deliver(seq_no, last, tx)? {
                return Ok(Flow::Stopped);
            }
        }

        Ok(Flow::Finished)
    }

    /// Mux `segment` and send it; `false` when the consumer is gone
    fn deliver(
        &self,
        seq_no: u64,
        segment: PendingSegment,
        tx: &mpsc::Sender<SegmentEvent>,
    ) -> TranscodeResult<bool> {
        let duration = Duration::from_secs_f64((segment.end - segment.start).max(0.0));
        let pts = Duration::from_secs_f64(segment.start.max(0.0));
        let packets = segment.packets.len();
        let data = self.mux(segment.packets)?;

        debug!(
            seq_no,
            packets,
            bytes = data.len(),
            "Cut segment of {:.3}s at {:.3}s",
            duration.as_secs_f64(),
            pts.as_secs_f64()
        );

        let event = SegmentEvent::Segment(InputSegment {
            seq_no,
            pts,
            duration,
            data,
        });
        Ok(tx.blocking_send(event).is_ok())
    }

    /// Write `packets` into a standalone MPEG-TS buffer
    fn mux(&self, packets: Vec<Packet>) -> TranscodeResult<Bytes> {
        let file = tempfile::Builder::new()
            .prefix("lp-segment-")
            .suffix(".ts")
            .tempfile()?;

        {
            let mut octx = format::output_as(file.path(), "mpegts").map_err(|e| {
                TranscodeError::multiplex(format!("Failed to create segment muxer: {}", e))
            })?;
            let mapping = add_copy_streams(&self.ictx, &mut octx)?;
            octx.write_header().map_err(|e| {
                TranscodeError::multiplex(format!("Failed to write segment header: {}", e))
            })?;

            for packet in packets {
                let index = packet.stream();
                let Some(output_index) = mapping.get(index).copied().flatten() else {
                    continue;
                };
                write_copied_packet(&mut octx, packet, self.time_bases[index], output_index)?;
            }

            octx.write_trailer().map_err(|e| {
                TranscodeError::multiplex(format!("Failed to write segment trailer: {}", e))
            })?;
        }

        Ok(Bytes::from(std::fs::read(file.path())?))
    }
}
