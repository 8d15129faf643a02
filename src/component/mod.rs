pub mod media_request;

pub use media_request::{
    AudioBitrate, ImageEncoding, MediaRequestPipeline, MediaRequestRunner, QualityPreset,
    RequestOptions, RunnerMode,
};
