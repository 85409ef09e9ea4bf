use std::sync::Arc;

use crate::adapters::{LibavContainerFactory, LibavSegmenter, LivepeerConfig, LivepeerHttpAdapter};
use crate::app::transcode_interactor::TranscodeInteractor;
use crate::error::TranscodeResult;
use crate::ports::{ContainerSinkFactory, SegmentSource, TranscodePort};

pub trait AppContainer: Send + Sync {
    fn transcode_interactor(&self) -> Arc<TranscodeInteractor>;
}

/// Wires the production adapters
pub struct DefaultAppContainer {
    transcode_interactor: Arc<TranscodeInteractor>,
}

impl DefaultAppContainer {
    pub fn new(livepeer: LivepeerConfig) -> TranscodeResult<Self> {
        let transcode_port = Arc::new(LivepeerHttpAdapter::new(livepeer)?);
        let segment_source = Arc::new(LibavSegmenter::new()?);
        let sink_factory = Arc::new(LibavContainerFactory::new()?);

        let transcode_interactor = Arc::new(TranscodeInteractor::new(
            Arc::clone(&transcode_port) as Arc<dyn TranscodePort>,
            Arc::clone(&segment_source) as Arc<dyn SegmentSource>,
            Arc::clone(&sink_factory) as Arc<dyn ContainerSinkFactory>,
        ));

        Ok(Self {
            transcode_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn transcode_interactor(&self) -> Arc<TranscodeInteractor> {
        Arc::clone(&self.transcode_interactor)
    }
}
