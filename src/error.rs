use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 超出上限時給使用者的調整建議
pub const SIZE_GUIDANCE: &str =
    "reduce frame count, choose a smaller resolution preset, or lower the audio bitrate";

const BYTES_PER_MB: f64 = 1_000_000.0;

#[derive(Debug, Error)]
pub enum MediaError {
    /// 參數錯誤，在解碼前即回報
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("decode error in {media}: {reason}")]
    Decode { media: String, reason: String },

    #[error(
        "request payload is {:.2} MB, exceeding the {:.2} MB limit; {}",
        as_mb(.actual_bytes),
        as_mb(.limit_bytes),
        SIZE_GUIDANCE
    )]
    SizeExceeded { actual_bytes: u64, limit_bytes: u64 },
}

impl MediaError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn decode(media: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::Decode {
            media: media.to_string(),
            reason: reason.into(),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_mb(bytes: &u64) -> f64 {
    *bytes as f64 / BYTES_PER_MB
}

pub type MediaResult<T> = Result<T, MediaError>;

/// 估算時略過的元素（不中斷流程）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstimationWarning {
    pub element: String,
    pub reason: String,
}

impl EstimationWarning {
    pub fn new(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for EstimationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.element, self.reason)
    }
}
