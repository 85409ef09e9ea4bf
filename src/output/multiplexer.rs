//! Output multiplexer: turns transcoded segment sets into output files
//!
//! The multiplexer is created once per job in the mode fixed by the job's
//! destination and never changes mode afterwards:
//!
//! - container mode appends every rendition's packets to one container file
//!   per rendition, writing the header from the first segment only;
//! - playlist mode writes each transcoded buffer verbatim as a `.ts` segment
//!   file and accumulates what the playlists need, which are written by
//!   [`OutputMultiplexer::finalize`].

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::model::*;
use crate::error::{TranscodeError, TranscodeResult};
use crate::output::playlist::{MediaSegment, PlaylistAssembler, RenditionPlaylist};
use crate::ports::{ContainerSink, ContainerSinkFactory};
use crate::utils::path::PathUtils;

/// Bandwidth advertised for a rendition, from the size of one segment
///
/// Rounded down to a multiple of 1000; a zero-length duration yields 0.
pub fn estimate_bandwidth(bytes: usize, duration: Duration) -> u64 {
    let seconds = duration.as_secs_f64();
    if seconds <= 0.0 {
        return 0;
    }
    let bandwidth = (bytes as f64 * 8.0 / seconds) as u64;
    bandwidth - bandwidth % 1000
}

/// Container-mode state of one rendition
struct ContainerOutput {
    path: PathBuf,
    sink: Box<dyn ContainerSink>,
    header_written: bool,
    packets: u64,
}

/// Playlist-mode state of one rendition
#[derive(Debug, Clone)]
pub struct PlaylistOutput {
    pub name: String,
    pub resolution: Option<String>,
    /// Frozen after the first segment
    pub bandwidth: Option<u64>,
    pub segments: Vec<MediaSegment>,
    pub files: Vec<PathBuf>,
}

enum MuxState {
    Container(Vec<ContainerOutput>),
    Playlist {
        assembler: PlaylistAssembler,
        outputs: Vec<PlaylistOutput>,
    },
}

/// Per-rendition output bookkeeping for one job
pub struct OutputMultiplexer {
    dst: PathBuf,
    paths: PathUtils,
    state: MuxState,
    segments: u64,
}

impl OutputMultiplexer {
    /// Prepare outputs for `job`; container files are created immediately
    pub fn open(job: &TranscodeJob, sinks: &dyn ContainerSinkFactory) -> TranscodeResult<Self> {
        let paths = PathUtils::new();
        let names = job.renditions.names();

        let state = match job.mode {
            OutputMode::Container(_) => {
                let mut outputs: Vec<ContainerOutput> = Vec::with_capacity(names.len());
                for index in 0..names.len() {
                    let path = paths.container_output(&job.output, index, names.len());
                    match sinks.create(&path) {
                        Ok(sink) => outputs.push(ContainerOutput {
                            path,
                            sink,
                            header_written: false,
                            packets: 0,
                        }),
                        Err(e) => {
                            close_quietly(outputs);
                            return Err(TranscodeError::multiplex(format!(
                                "Can't create output file {}: {}",
                                path.display(),
                                e
                            )));
                        }
                    }
                }
                MuxState::Container(outputs)
            }
            OutputMode::Playlist => MuxState::Playlist {
                assembler: PlaylistAssembler::new(job.segment_length),
                outputs: names
                    .into_iter()
                    .enumerate()
                    .map(|(index, name)| PlaylistOutput {
                        name,
                        resolution: job.renditions.resolution(index),
                        bandwidth: None,
                        segments: Vec::new(),
                        files: Vec::new(),
                    })
                    .collect(),
            },
        };

        Ok(Self {
            dst: job.output.clone(),
            paths,
            state,
            segments: 0,
        })
    }

    /// Number of segment sets consumed so far
    pub fn segments(&self) -> u64 {
        self.segments
    }

    /// Playlist-mode state, `None` in container mode
    pub fn playlist_outputs(&self) -> Option<&[PlaylistOutput]> {
        match &self.state {
            MuxState::Playlist { outputs, .. } => Some(outputs),
            MuxState::Container(_) => None,
        }
    }

    /// Consume the transcoded renditions of one input segment
    pub fn consume(
        &mut self,
        segment: &InputSegment,
        transcoded: &TranscodedSegmentSet,
    ) -> TranscodeResult<()> {
        let expected = match &self.state {
            MuxState::Container(outputs) => outputs.len(),
            MuxState::Playlist { outputs, .. } => outputs.len(),
        };
        if transcoded.len() != expected {
            return Err(TranscodeError::multiplex(format!(
                "segment {} has {} renditions, expected {}",
                segment.seq_no,
                transcoded.len(),
                expected
            )));
        }

        match &mut self.state {
            MuxState::Container(outputs) => {
                for (index, (output, data)) in outputs.iter_mut().zip(transcoded.iter()).enumerate() {
                    let write_header = !output.header_written;
                    let packets = output.sink.write_segment(data, write_header).map_err(|e| {
                        warn!(rendition = index, seq_no = segment.seq_no, "Copy packets failed: {}", e);
                        e
                    })?;
                    output.header_written = true;
                    output.packets += packets;
                    debug!(
                        rendition = index,
                        seq_no = segment.seq_no,
                        packets,
                        "Appended segment to {}",
                        output.path.display()
                    );
                }
            }
            MuxState::Playlist { outputs, .. } => {
                for (output, data) in outputs.iter_mut().zip(transcoded.iter()) {
                    let file_name = self.paths.segment_file_name(&self.dst, &output.name, segment.seq_no);
                    let path = self.paths.sibling(&self.dst, &file_name);
                    std::fs::write(&path, data).map_err(|e| {
                        TranscodeError::multiplex(format!("Failed to write {}: {}", path.display(), e))
                    })?;
                    output.files.push(path);

                    if output.bandwidth.is_none() {
                        let bandwidth = estimate_bandwidth(data.len(), segment.duration);
                        debug!(rendition = %output.name, bandwidth, "Estimated bandwidth");
                        output.bandwidth = Some(bandwidth);
                    }

                    output.segments.push(MediaSegment {
                        seq_id: segment.seq_no,
                        duration: segment.duration.as_secs_f64(),
                        uri: file_name,
                    });
                }
            }
        }

        self.segments += 1;
        Ok(())
    }

    /// Finish a successful job and return every file written
    ///
    /// Container mode closes every file (all are attempted, the first failure
    /// is returned); playlist mode writes the master and media playlists.
    pub fn finalize(self) -> TranscodeResult<Vec<PathBuf>> {
        match self.state {
            MuxState::Container(outputs) => {
                let mut written = Vec::with_capacity(outputs.len());
                let mut first_error = None;
                for output in outputs {
                    debug!("Closing {} after {} packets", output.path.display(), output.packets);
                    if let Err(e) = output.sink.close() {
                        warn!("Closing {} failed: {}", output.path.display(), e);
                        first_error.get_or_insert(e);
                    }
                    written.push(output.path);
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(written),
                }
            }
            MuxState::Playlist { assembler, outputs } => {
                let mut written: Vec<PathBuf> =
                    outputs.iter().flat_map(|o| o.files.iter().cloned()).collect();
                let renditions: Vec<RenditionPlaylist> = outputs
                    .into_iter()
                    .map(|o| RenditionPlaylist {
                        name: o.name,
                        resolution: o.resolution,
                        bandwidth: o.bandwidth.unwrap_or(0),
                        segments: o.segments,
                    })
                    .collect();
                written.extend(assembler.write_package(&self.dst, &renditions)?);
                Ok(written)
            }
        }
    }

    /// Tear down after a failed job, closing open files best-effort
    ///
    /// Nothing already written is removed. Returns the files left on disk.
    pub fn abort(self) -> Vec<PathBuf> {
        match self.state {
            MuxState::Container(outputs) => {
                let written = outputs.iter().map(|o| o.path.clone()).collect();
                close_quietly(outputs);
                written
            }
            MuxState::Playlist { outputs, .. } => {
                outputs.into_iter().flat_map(|o| o.files).collect()
            }
        }
    }
}

fn close_quietly(outputs: Vec<ContainerOutput>) {
    for output in outputs {
        if let Err(e) = output.sink.close() {
            warn!("Closing {} failed: {}", output.path.display(), e);
        }
    }
}
