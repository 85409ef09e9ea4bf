// Transcode interactor - Drives one job from segmenting to finished outputs

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::model::*;
use crate::error::{TranscodeError, TranscodeResult};
use crate::output::OutputMultiplexer;
use crate::ports::*;

/// Remote stream name for a job started at `now`
pub fn session_name(now: DateTime<Utc>) -> String {
    format!("tod_{}", now.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Interactor for the transcoding use case
pub struct TranscodeInteractor {
    transcoder: Arc<dyn TranscodePort>,
    source: Arc<dyn SegmentSource>,
    sinks: Arc<dyn ContainerSinkFactory>,
}

impl TranscodeInteractor {
    /// Create new transcode interactor with injected ports
    pub fn new(
        transcoder: Arc<dyn TranscodePort>,
        source: Arc<dyn SegmentSource>,
        sinks: Arc<dyn ContainerSinkFactory>,
    ) -> Self {
        Self {
            transcoder,
            source,
            sinks,
        }
    }

    /// Run `job` to completion
    ///
    /// The remote session is deleted on every path once it was created; a
    /// failed deletion is logged and never replaces the job's own outcome.
    pub async fn execute(&self, job: &TranscodeJob) -> TranscodeResult<TranscodeReport> {
        let name = session_name(Utc::now());
        info!(
            "Transcoding {} to {} ({}, {} renditions)",
            job.input.display(),
            job.output.display(),
            job.mode,
            job.renditions.len()
        );

        let session = self.transcoder.create_session(&name, &job.renditions).await?;
        let outcome = self.stream(job, &session).await;

        if let Err(e) = self.transcoder.delete_session(&session).await {
            warn!("Failed to delete stream {}: {}", session.id, e);
        }

        outcome
    }

    async fn stream(&self, job: &TranscodeJob, session: &Session) -> TranscodeResult<TranscodeReport> {
        let mut mux = OutputMultiplexer::open(job, self.sinks.as_ref())?;

        let cancel = CancellationToken::new();
        let _stop_source = cancel.clone().drop_guard();

        let mut events = match self.source.start(&job.input, job.segment_length, cancel.clone()) {
            Ok(events) => events,
            Err(e) => {
                mux.abort();
                return Err(e);
            }
        };

        loop {
            let step = match events.recv().await {
                Some(SegmentEvent::Segment(segment)) => self.process(session, &mut mux, segment).await,
                Some(SegmentEvent::End) => break,
                Some(SegmentEvent::Failed(message)) => Err(TranscodeError::Source { message }),
                None => Err(TranscodeError::Source {
                    message: "segment source closed without an end marker".to_string(),
                }),
            };

            if let Err(e) = step {
                cancel.cancel();
                let consumed = mux.segments();
                let left = mux.abort();
                error!(
                    segments = consumed,
                    files_left = left.len(),
                    "Transcoding stopped: {}",
                    e
                );
                return Err(e);
            }
        }

        let segments = mux.segments();
        let written_files = mux.finalize()?;
        info!(
            "Transcoded {} segments into {} files",
            segments,
            written_files.len()
        );

        Ok(TranscodeReport {
            session_id: session.id.clone(),
            segments,
            written_files,
        })
    }

    async fn process(
        &self,
        session: &Session,
        mux: &mut OutputMultiplexer,
        segment: InputSegment,
    ) -> TranscodeResult<()> {
        debug!(
            seq_no = segment.seq_no,
            bytes = segment.data.len(),
            "Pushing segment at {:.3}s",
            segment.pts.as_secs_f64()
        );

        let transcoded = self
            .transcoder
            .push_segment(session, segment.seq_no, segment.duration, segment.data.clone())
            .await?;
        mux.consume(&segment, &transcoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_session_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(session_name(now), "tod_2024-03-09T14:05:07Z");
    }
}
