// Adapters - External system implementations

pub mod livepeer_http;
pub mod mux_libav;
pub mod segmenter_libav;
pub mod toml_config;

// Re-export adapters
pub use livepeer_http::{LivepeerConfig, LivepeerHttpAdapter};
pub use mux_libav::LibavContainerFactory;
pub use segmenter_libav::LibavSegmenter;
pub use toml_config::{FileSettings, TomlConfigAdapter};
