//! 音訊擷取：單聲道、固定位元率的 Ogg/Vorbis

use super::media_source::{MediaSource, SourceMetadata};
use super::options::{AudioBitrate, ClipWindow};
use crate::error::{MediaError, MediaResult};
use crate::tools::FfmpegCommand;
use log::{debug, info};
use serde::Serialize;
use std::fmt;

pub const AUDIO_MIME_TYPE: &str = "audio/ogg";

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub bytes: Vec<u8>,
    pub duration_seconds: f64,
    pub bitrate: AudioBitrate,
    /// 固定為 1（單聲道）
    pub channels: u8,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSkipReason {
    Disabled,
    NoAudioStream,
    /// 動畫或靜態圖沒有音訊
    NotApplicable,
}

impl fmt::Display for AudioSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "audio disabled"),
            Self::NoAudioStream => write!(f, "source has no audio stream"),
            Self::NotApplicable => write!(f, "animated images carry no audio"),
        }
    }
}

/// 解析後的音訊擷取計畫；預估與實際擷取共用
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioPlan {
    Extract {
        start: f64,
        duration: f64,
        bitrate: AudioBitrate,
    },
    Skip(AudioSkipReason),
}

impl AudioPlan {
    #[must_use]
    pub const fn duration(&self) -> Option<f64> {
        match self {
            Self::Extract { duration, .. } => Some(*duration),
            Self::Skip(_) => None,
        }
    }

    #[must_use]
    pub const fn bitrate(&self) -> Option<AudioBitrate> {
        match self {
            Self::Extract { bitrate, .. } => Some(*bitrate),
            Self::Skip(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioOutcome {
    Extracted(AudioSegment),
    Skipped(AudioSkipReason),
}

impl AudioOutcome {
    #[must_use]
    pub const fn segment(&self) -> Option<&AudioSegment> {
        match self {
            Self::Extracted(segment) => Some(segment),
            Self::Skipped(_) => None,
        }
    }

    #[must_use]
    pub fn into_segment(self) -> Option<AudioSegment> {
        match self {
            Self::Extracted(segment) => Some(segment),
            Self::Skipped(_) => None,
        }
    }
}

/// 決定是否擷取音訊以及擷取範圍
pub fn plan_audio(
    source: &SourceMetadata,
    bitrate: Option<AudioBitrate>,
    clip: Option<&ClipWindow>,
) -> MediaResult<AudioPlan> {
    let Some(bitrate) = bitrate else {
        return Ok(AudioPlan::Skip(AudioSkipReason::Disabled));
    };
    if source.kind.is_frame_based() {
        return Ok(AudioPlan::Skip(AudioSkipReason::NotApplicable));
    }
    if !source.has_audio {
        return Ok(AudioPlan::Skip(AudioSkipReason::NoAudioStream));
    }

    let (start, duration) = match clip {
        Some(window) => {
            window.validate()?;
            window.resolve(source.duration_seconds)?
        }
        None => (0.0, source.duration_seconds),
    };

    Ok(AudioPlan::Extract {
        start,
        duration,
        bitrate,
    })
}

/// 依計畫擷取音訊
pub fn extract_audio(source: &MediaSource, plan: &AudioPlan) -> MediaResult<AudioOutcome> {
    let (start, duration, bitrate) = match *plan {
        AudioPlan::Extract {
            start,
            duration,
            bitrate,
        } => (start, duration, bitrate),
        AudioPlan::Skip(reason) => {
            debug!("略過音訊: {reason}");
            return Ok(AudioOutcome::Skipped(reason));
        }
    };

    let name = &source.metadata().name;
    let output = FfmpegCommand::audio_transcode(source.path(), bitrate.kbps(), start, duration)
        .build_command()
        .output()
        .map_err(|e| MediaError::decode(name, format!("failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::decode(
            name,
            format!("audio extraction failed: {}", stderr.trim()),
        ));
    }

    if output.stdout.is_empty() {
        return Err(MediaError::decode(name, "audio extraction produced no data"));
    }

    info!(
        "音訊擷取完成: {:.2}s @ {}，{} bytes",
        duration,
        bitrate,
        output.stdout.len()
    );

    Ok(AudioOutcome::Extracted(AudioSegment {
        bytes: output.stdout,
        duration_seconds: duration,
        bitrate,
        channels: 1,
        mime_type: AUDIO_MIME_TYPE,
    }))
}
