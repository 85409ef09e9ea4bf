// Libav mux adapter - Container output through ffmpeg-next stream copy

use std::io::Write;
use std::path::{Path, PathBuf};

use ffmpeg_next::codec::{self, encoder};
use ffmpeg_next::format::context::{Input, Output};
use ffmpeg_next::{format, media, Packet, Rational};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{TranscodeError, TranscodeResult};
use crate::ports::{ContainerSink, ContainerSinkFactory};

/// Initialise libav once per process
pub fn init_libav() -> TranscodeResult<()> {
    ffmpeg_next::init()
        .map_err(|e| TranscodeError::multiplex(format!("FFmpeg initialization failed: {}", e)))
}

/// Add one copy-mode output stream per audio/video input stream
///
/// Returns the input-index to output-index mapping; streams of other media
/// types map to `None` and their packets are dropped.
pub(crate) fn add_copy_streams(
    ictx: &Input,
    octx: &mut Output,
) -> TranscodeResult<Vec<Option<usize>>> {
    let mut mapping = Vec::with_capacity(ictx.streams().count());
    let mut next = 0usize;

    for stream in ictx.streams() {
        let medium = stream.parameters().medium();
        if medium != media::Type::Video && medium != media::Type::Audio {
            mapping.push(None);
            continue;
        }

        let mut out_stream = octx
            .add_stream(encoder::find(codec::Id::None))
            .map_err(|e| TranscodeError::multiplex(format!("Failed to add stream: {}", e)))?;
        out_stream.set_parameters(stream.parameters());
        out_stream.set_time_base(stream.time_base());
        // Let the output muxer choose its own codec tag
        unsafe {
            (*out_stream.parameters().as_mut_ptr()).codec_tag = 0;
        }

        mapping.push(Some(next));
        next += 1;
    }

    if next == 0 {
        return Err(TranscodeError::multiplex("No audio or video streams to copy"));
    }
    Ok(mapping)
}

/// Rescale `packet` from `input_tb` into output stream `index` and write it
pub(crate) fn write_copied_packet(
    octx: &mut Output,
    mut packet: Packet,
    input_tb: Rational,
    index: usize,
) -> TranscodeResult<()> {
    let output_tb = octx
        .stream(index)
        .map(|s| s.time_base())
        .ok_or_else(|| TranscodeError::multiplex(format!("Output stream {} missing", index)))?;

    packet.rescale_ts(input_tb, output_tb);
    packet.set_position(-1);
    packet.set_stream(index);
    packet
        .write_interleaved(octx)
        .map_err(|e| TranscodeError::multiplex(format!("Failed to write packet: {}", e)))
}

/// A transcoded segment spilled to disk so libav can demux it
///
/// `input` is declared first so it is closed before the file is removed.
struct SpooledSegment {
    input: Input,
    _file: NamedTempFile,
}

impl SpooledSegment {
    fn open(segment: &[u8]) -> TranscodeResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("lp-rendition-")
            .suffix(".ts")
            .tempfile()?;
        file.write_all(segment)?;
        file.flush()?;

        let input = format::input(file.path())
            .map_err(|e| TranscodeError::multiplex(format!("Failed to demux segment: {}", e)))?;

        Ok(Self { input, _file: file })
    }
}

/// Container file fed by stream copy from transcoded MPEG-TS segments
pub struct LibavContainerSink {
    path: PathBuf,
    octx: Output,
    header_written: bool,
    mapping: Vec<Option<usize>>,
}

impl LibavContainerSink {
    fn write_header(&mut self, input: &Input) -> TranscodeResult<()> {
        self.mapping = add_copy_streams(input, &mut self.octx)?;
        self.octx.write_header().map_err(|e| {
            TranscodeError::multiplex(format!(
                "Failed to write header to {}: {}",
                self.path.display(),
                e
            ))
        })?;
        self.header_written = true;
        debug!(
            "Wrote container header for {} ({} streams)",
            self.path.display(),
            self.octx.streams().count()
        );
        Ok(())
    }
}

impl ContainerSink for LibavContainerSink {
    fn write_segment(&mut self, segment: &[u8], write_header: bool) -> TranscodeResult<u64> {
        let mut spooled = SpooledSegment::open(segment)?;

        if write_header {
            self.write_header(&spooled.input)?;
        } else if !self.header_written {
            return Err(TranscodeError::multiplex(format!(
                "Packets offered to {} before its header",
                self.path.display()
            )));
        }

        let time_bases: Vec<Rational> = spooled.input.streams().map(|s| s.time_base()).collect();
        let mut copied = 0u64;

        loop {
            let mut packet = Packet::empty();
            match packet.read(&mut spooled.input) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => {
                    return Err(TranscodeError::multiplex(format!(
                        "Failed to read transcoded packet: {}",
                        e
                    )))
                }
            }

            let input_index = packet.stream();
            let Some(output_index) = self.mapping.get(input_index).copied().flatten() else {
                continue;
            };
            write_copied_packet(&mut self.octx, packet, time_bases[input_index], output_index)?;
            copied += 1;
        }

        Ok(copied)
    }

    fn close(mut self: Box<Self>) -> TranscodeResult<()> {
        if !self.header_written {
            warn!("No segments reached {}, leaving it without a header", self.path.display());
            return Ok(());
        }
        self.octx.write_trailer().map_err(|e| {
            TranscodeError::multiplex(format!(
                "Failed to write trailer to {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// Creates [`LibavContainerSink`]s; the container format follows the file extension
pub struct LibavContainerFactory;

impl LibavContainerFactory {
    pub fn new() -> TranscodeResult<Self> {
        init_libav()?;
        Ok(Self)
    }
}

impl ContainerSinkFactory for LibavContainerFactory {
    fn create(&self, path: &Path) -> TranscodeResult<Box<dyn ContainerSink>> {
        let octx = format::output(path).map_err(|e| {
            TranscodeError::multiplex(format!("Failed to create output {}: {}", path.display(), e))
        })?;

        Ok(Box::new(LibavContainerSink {
            path: path.to_path_buf(),
            octx,
            header_written: false,
            mapping: Vec::new(),
        }))
    }
}
