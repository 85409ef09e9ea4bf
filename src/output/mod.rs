//! Output multiplexing and HLS playlist assembly

pub mod multiplexer;
pub mod playlist;

pub use multiplexer::{estimate_bandwidth, OutputMultiplexer, PlaylistOutput};
pub use playlist::{MasterPlaylist, MediaPlaylist, MediaSegment, PlaylistAssembler, VariantStream};
