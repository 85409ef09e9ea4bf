use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use lp_transcode::app::TranscodeInteractor;
use lp_transcode::domain::model::*;
use lp_transcode::domain::rules::{ProfileResolver, RenditionSelection};
use lp_transcode::ports::*;
use lp_transcode::{ProfileError, TranscodeError, TranscodeResult};

/// Test doubles for the three ports
mod fakes {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Create(String, usize),
        Push(u64, Duration),
        Delete(String),
    }

    #[derive(Default)]
    pub struct FakeTranscoder {
        pub calls: Mutex<Vec<Call>>,
        pub fail_on: Option<u64>,
        pub fail_delete: bool,
    }

    impl FakeTranscoder {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TranscodePort for FakeTranscoder {
        async fn create_session(&self, name: &str, renditions: &RenditionSet) -> TranscodeResult<Session> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Create(name.to_string(), renditions.len()));
            Ok(Session {
                id: "stream-1".to_string(),
                name: name.to_string(),
                rendition_count: renditions.len(),
            })
        }

        async fn push_segment(
            &self,
            session: &Session,
            seq_no: u64,
            duration: Duration,
            payload: Bytes,
        ) -> TranscodeResult<TranscodedSegmentSet> {
            self.calls.lock().unwrap().push(Call::Push(seq_no, duration));
            if self.fail_on == Some(seq_no) {
                return Err(TranscodeError::Push {
                    seq_no,
                    message: "503 Service Unavailable".to_string(),
                });
            }
            let renditions = (0..session.rendition_count)
                .map(|r| Bytes::from(format!("r{}-s{}-{}", r, seq_no, payload.len())))
                .collect();
            TranscodedSegmentSet::new(renditions, session.rendition_count, seq_no)
        }

        async fn delete_session(&self, session: &Session) -> TranscodeResult<()> {
            self.calls.lock().unwrap().push(Call::Delete(session.id.clone()));
            if self.fail_delete {
                return Err(TranscodeError::session("delete stream: 500"));
            }
            Ok(())
        }
    }

    /// Emits `count` fixed-length segments, then either `End` or a failure
    pub struct FakeSource {
        pub count: u64,
        pub segment_length: Duration,
        pub fail_after: Option<u64>,
    }

    impl SegmentSource for FakeSource {
        fn start(
            &self,
            _input: &Path,
            _segment_length: Duration,
            cancel: CancellationToken,
        ) -> TranscodeResult<mpsc::Receiver<SegmentEvent>> {
            let (tx, rx) = mpsc::channel(1);
            let count = self.count;
            let length = self.segment_length;
            let fail_after = self.fail_after;

            tokio::spawn(async move {
                for seq_no in 0..count {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if fail_after == Some(seq_no) {
                        let _ = tx.send(SegmentEvent::Failed("corrupt packet".to_string())).await;
                        return;
                    }
                    let segment = InputSegment {
                        seq_no,
                        pts: length * seq_no as u32,
                        duration: length,
                        data: Bytes::from(vec![0x47; 188 * 10]),
                    };
                    if tx.send(SegmentEvent::Segment(segment)).await.is_err() {
                        return;
                    }
                }
                let _ = tx.send(SegmentEvent::End).await;
            });

            Ok(rx)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum SinkOp {
        Write { path: PathBuf, header: bool, bytes: usize },
        Close(PathBuf),
    }

    /// Records sink calls; `fail_write_on` makes the n-th write of every sink fail
    #[derive(Default)]
    pub struct FakeSinks {
        pub ops: Arc<Mutex<Vec<SinkOp>>>,
        pub fail_write_on: Option<u64>,
    }

    struct FakeSink {
        path: PathBuf,
        ops: Arc<Mutex<Vec<SinkOp>>>,
        writes: u64,
        fail_write_on: Option<u64>,
    }

    impl ContainerSink for FakeSink {
        fn write_segment(&mut self, segment: &[u8], write_header: bool) -> TranscodeResult<u64> {
            let seq_no = self.writes;
            self.writes += 1;
            if self.fail_write_on == Some(seq_no) {
                return Err(TranscodeError::multiplex(format!(
                    "Can't demux segment {} for {}",
                    seq_no,
                    self.path.display()
                )));
            }
            self.ops.lock().unwrap().push(SinkOp::Write {
                path: self.path.clone(),
                header: write_header,
                bytes: segment.len(),
            });
            Ok(1)
        }

        fn close(self: Box<Self>) -> TranscodeResult<()> {
            self.ops.lock().unwrap().push(SinkOp::Close(self.path.clone()));
            Ok(())
        }
    }

    impl ContainerSinkFactory for FakeSinks {
        fn create(&self, path: &Path) -> TranscodeResult<Box<dyn ContainerSink>> {
            Ok(Box::new(FakeSink {
                path: path.to_path_buf(),
                ops: Arc::clone(&self.ops),
                writes: 0,
                fail_write_on: self.fail_write_on,
            }))
        }
    }
}

use fakes::*;

const EIGHTEEN_SECONDS: Duration = Duration::from_secs(18);

fn custom_profile() -> RenditionSet {
    ProfileResolver::resolve(&RenditionSelection {
        resolution: Some("1280x720".to_string()),
        bitrate_kbps: Some(2000),
        gop: Some("2s".to_string()),
        ..Default::default()
    })
    .unwrap()
}

fn two_presets() -> RenditionSet {
    ProfileResolver::resolve(&RenditionSelection {
        presets: Some("P240p30fps16x9,P360p30fps16x9".to_string()),
        ..Default::default()
    })
    .unwrap()
}

fn interactor(
    transcoder: &Arc<FakeTranscoder>,
    source: FakeSource,
    sinks: &Arc<FakeSinks>,
) -> TranscodeInteractor {
    TranscodeInteractor::new(
        Arc::clone(transcoder) as Arc<dyn TranscodePort>,
        Arc::new(source),
        Arc::clone(sinks) as Arc<dyn ContainerSinkFactory>,
    )
}

fn source(count: u64) -> FakeSource {
    FakeSource {
        count,
        segment_length: EIGHTEEN_SECONDS,
        fail_after: None,
    }
}

fn job(dir: &TempDir, output: &str, renditions: RenditionSet) -> TranscodeJob {
    TranscodeJob::new(
        dir.path().join("input.mp4"),
        dir.path().join(output),
        renditions,
        EIGHTEEN_SECONDS,
    )
    .unwrap()
}

#[tokio::test]
async fn test_single_profile_container_output() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder::default());
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "movie.mp4", custom_profile());

    let report = interactor(&transcoder, source(3), &sinks)
        .execute(&job)
        .await
        .unwrap();

    assert_eq!(report.segments, 3);
    assert_eq!(report.session_id, "stream-1");
    assert_eq!(report.written_files, vec![dir.path().join("movie.mp4")]);

    let ops = sinks.ops.lock().unwrap().clone();
    let headers: Vec<bool> = ops
        .iter()
        .filter_map(|op| match op {
            SinkOp::Write { header, .. } => Some(*header),
            SinkOp::Close(_) => None,
        })
        .collect();
    assert_eq!(headers, vec![true, false, false]);
    assert_eq!(ops.last(), Some(&SinkOp::Close(dir.path().join("movie.mp4"))));

    let calls = transcoder.calls();
    assert!(matches!(&calls[0], Call::Create(name, 1) if name.starts_with("tod_")));
    assert_eq!(calls[1], Call::Push(0, EIGHTEEN_SECONDS));
    assert_eq!(calls[3], Call::Push(2, EIGHTEEN_SECONDS));
    assert_eq!(calls.last(), Some(&Call::Delete("stream-1".to_string())));
}

#[tokio::test]
async fn test_single_profile_playlist_output() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder::default());
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "movie.m3u8", custom_profile());

    let report = interactor(&transcoder, source(3), &sinks)
        .execute(&job)
        .await
        .unwrap();

    assert_eq!(report.segments, 3);
    assert!(sinks.ops.lock().unwrap().is_empty());

    let master = std::fs::read_to_string(dir.path().join("movie.m3u8")).unwrap();
    assert!(master.contains("RESOLUTION=1280x720"));
    assert!(master.contains("NAME=\"movie_custom\""));
    assert!(master.contains("movie_custom.m3u8"));

    let media = std::fs::read_to_string(dir.path().join("movie_custom.m3u8")).unwrap();
    let uris: Vec<&str> = media.lines().filter(|l| l.ends_with(".ts")).collect();
    assert_eq!(
        uris,
        vec!["movie_custom_0.ts", "movie_custom_1.ts", "movie_custom_2.ts"]
    );
    assert!(media.contains("#EXT-X-MEDIA-SEQUENCE:0"));
    assert!(media.contains("#EXT-X-TARGETDURATION:18"));

    let segment = std::fs::read(dir.path().join("movie_custom_1.ts")).unwrap();
    assert_eq!(segment, b"r0-s1-1880");
}

#[tokio::test]
async fn test_two_presets_playlist_output() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder::default());
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "master.m3u8", two_presets());

    let report = interactor(&transcoder, source(4), &sinks)
        .execute(&job)
        .await
        .unwrap();

    // 8 segment files, 2 media playlists, 1 master
    assert_eq!(report.written_files.len(), 11);

    let master = std::fs::read_to_string(dir.path().join("master.m3u8")).unwrap();
    assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 2);
    assert!(!master.contains("RESOLUTION="));

    let mut counts = Vec::new();
    for preset in ["P240p30fps16x9", "P360p30fps16x9"] {
        let media =
            std::fs::read_to_string(dir.path().join(format!("master_{}.m3u8", preset))).unwrap();
        assert!(media.contains("#EXT-X-MEDIA-SEQUENCE:0"));
        assert!(media.contains(&format!("master_{}_0.ts", preset)));
        counts.push(media.matches("#EXTINF").count());
    }
    assert_eq!(counts, vec![4, 4]);
}

#[tokio::test]
async fn test_push_failure_keeps_written_segments() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder {
        fail_on: Some(2),
        ..Default::default()
    });
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "movie.m3u8", custom_profile());

    let err = interactor(&transcoder, source(5), &sinks)
        .execute(&job)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscodeError::Push { seq_no: 2, .. }));
    assert!(!err.is_preflight());

    assert!(dir.path().join("movie_custom_0.ts").exists());
    assert!(dir.path().join("movie_custom_1.ts").exists());
    assert!(!dir.path().join("movie_custom_2.ts").exists());
    assert!(!dir.path().join("movie.m3u8").exists());

    let calls = transcoder.calls();
    let pushes = calls.iter().filter(|c| matches!(c, Call::Push(..))).count();
    assert_eq!(pushes, 3);
    assert_eq!(calls.last(), Some(&Call::Delete("stream-1".to_string())));
}

#[tokio::test]
async fn test_push_failure_closes_containers() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder {
        fail_on: Some(1),
        ..Default::default()
    });
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "movie.ts", two_presets());

    let err = interactor(&transcoder, source(3), &sinks)
        .execute(&job)
        .await
        .unwrap_err();
    assert!(matches!(err, TranscodeError::Push { seq_no: 1, .. }));

    let ops = sinks.ops.lock().unwrap().clone();
    let closed: Vec<&SinkOp> = ops.iter().filter(|op| matches!(op, SinkOp::Close(_))).collect();
    assert_eq!(
        closed,
        vec![
            &SinkOp::Close(dir.path().join("movie_0.ts")),
            &SinkOp::Close(dir.path().join("movie_1.ts")),
        ]
    );
}

#[tokio::test]
async fn test_container_write_failure_aborts_job() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder::default());
    let sinks = Arc::new(FakeSinks {
        fail_write_on: Some(1),
        ..Default::default()
    });
    let job = job(&dir, "movie.mp4", two_presets());

    let err = interactor(&transcoder, source(4), &sinks)
        .execute(&job)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscodeError::Multiplex { ref message } if message.contains("segment 1")));
    assert!(!err.is_preflight());

    let ops = sinks.ops.lock().unwrap().clone();
    let writes = ops.iter().filter(|op| matches!(op, SinkOp::Write { .. })).count();
    assert_eq!(writes, 2);
    let closed: Vec<&SinkOp> = ops.iter().filter(|op| matches!(op, SinkOp::Close(_))).collect();
    assert_eq!(
        closed,
        vec![
            &SinkOp::Close(dir.path().join("movie_0.mp4")),
            &SinkOp::Close(dir.path().join("movie_1.mp4")),
        ]
    );

    let calls = transcoder.calls();
    let pushes = calls.iter().filter(|c| matches!(c, Call::Push(..))).count();
    assert_eq!(pushes, 2);
    assert_eq!(calls.last(), Some(&Call::Delete("stream-1".to_string())));
}

#[tokio::test]
async fn test_header_write_failure_aborts_job() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder::default());
    let sinks = Arc::new(FakeSinks {
        fail_write_on: Some(0),
        ..Default::default()
    });
    let job = job(&dir, "movie.flv", custom_profile());

    let err = interactor(&transcoder, source(3), &sinks)
        .execute(&job)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscodeError::Multiplex { .. }));
    assert_eq!(
        sinks.ops.lock().unwrap().clone(),
        vec![SinkOp::Close(dir.path().join("movie.flv"))]
    );
    assert_eq!(
        transcoder.calls().last(),
        Some(&Call::Delete("stream-1".to_string()))
    );
}

#[tokio::test]
async fn test_segment_file_write_failure_aborts_job() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder::default());
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "missing/movie.m3u8", custom_profile());

    let err = interactor(&transcoder, source(3), &sinks)
        .execute(&job)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscodeError::Multiplex { ref message } if message.contains("movie_custom_0.ts")));

    let calls = transcoder.calls();
    let pushes = calls.iter().filter(|c| matches!(c, Call::Push(..))).count();
    assert_eq!(pushes, 1);
    assert_eq!(calls.last(), Some(&Call::Delete("stream-1".to_string())));
    assert!(!dir.path().join("missing").exists());
}

#[tokio::test]
async fn test_playlist_write_failure_aborts_job() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("movie.m3u8")).unwrap();
    let transcoder = Arc::new(FakeTranscoder::default());
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "movie.m3u8", custom_profile());

    let err = interactor(&transcoder, source(2), &sinks)
        .execute(&job)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscodeError::Playlist { .. }));
    assert!(dir.path().join("movie_custom_0.ts").exists());
    assert!(dir.path().join("movie_custom_1.ts").exists());
    assert_eq!(
        transcoder.calls().last(),
        Some(&Call::Delete("stream-1".to_string()))
    );
}

#[tokio::test]
async fn test_source_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder::default());
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "movie.m3u8", custom_profile());
    let failing = FakeSource {
        fail_after: Some(1),
        ..source(3)
    };

    let err = interactor(&transcoder, failing, &sinks)
        .execute(&job)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscodeError::Source { ref message } if message == "corrupt packet"));
    assert!(dir.path().join("movie_custom_0.ts").exists());
    assert!(!dir.path().join("movie.m3u8").exists());
    assert_eq!(
        transcoder.calls().last(),
        Some(&Call::Delete("stream-1".to_string()))
    );
}

#[tokio::test]
async fn test_delete_failure_does_not_mask_success() {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(FakeTranscoder {
        fail_delete: true,
        ..Default::default()
    });
    let sinks = Arc::new(FakeSinks::default());
    let job = job(&dir, "movie.flv", custom_profile());

    let report = interactor(&transcoder, source(2), &sinks)
        .execute(&job)
        .await
        .unwrap();
    assert_eq!(report.segments, 2);
}

#[tokio::test]
async fn test_unknown_preset_makes_no_remote_calls() {
    let transcoder = Arc::new(FakeTranscoder::default());

    let err = ProfileResolver::resolve(&RenditionSelection {
        presets: Some("P240p30fps16x9,P9000p".to_string()),
        ..Default::default()
    })
    .unwrap_err();

    assert!(matches!(
        err,
        TranscodeError::Profile(ProfileError::UnknownPreset(ref name)) if name == "P9000p"
    ));
    assert!(err.is_preflight());
    assert!(transcoder.calls().is_empty());
}
