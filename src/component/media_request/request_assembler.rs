//! 請求內容組裝
//!
//! 順序固定：前導文字 → 影格（依時間）→ 音訊（最後，不穿插）

use super::audio_extractor::AudioSegment;
use super::image_transform::EncodedFrame;

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadPart {
    Text(String),
    Frame(EncodedFrame),
    Audio(AudioSegment),
}

impl PayloadPart {
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        match self {
            Self::Text(text) => text.len() as u64,
            Self::Frame(frame) => frame.bytes.len() as u64,
            Self::Audio(audio) => audio.bytes.len() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestPayload {
    parts: Vec<PayloadPart>,
}

impl RequestPayload {
    #[must_use]
    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    #[must_use]
    pub fn into_parts(self) -> Vec<PayloadPart> {
        self.parts
    }

    pub fn frames(&self) -> impl Iterator<Item = &EncodedFrame> {
        self.parts.iter().filter_map(|part| match part {
            PayloadPart::Frame(frame) => Some(frame),
            _ => None,
        })
    }

    #[must_use]
    pub fn audio(&self) -> Option<&AudioSegment> {
        self.parts.iter().find_map(|part| match part {
            PayloadPart::Audio(audio) => Some(audio),
            _ => None,
        })
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames().count()
    }

    #[must_use]
    pub fn frame_bytes(&self) -> u64 {
        self.frames().map(|f| f.bytes.len() as u64).sum()
    }

    #[must_use]
    pub fn audio_bytes(&self) -> u64 {
        self.audio().map_or(0, |a| a.bytes.len() as u64)
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(PayloadPart::byte_len).sum()
    }
}

/// 動畫來源的說明文字
#[must_use]
pub fn describe_animation(sample_count: usize, duration_seconds: f64, effective_rate: f64) -> String {
    let noun = if sample_count == 1 { "frame" } else { "frames" };
    format!(
        "The following {sample_count} {noun} were sampled in chronological order from a \
         {duration_seconds:.2}-second animation at about {effective_rate:.2} frames per second."
    )
}

/// 依固定順序組裝請求
#[must_use]
pub fn assemble_request(
    context_text: Option<&str>,
    animation_note: Option<String>,
    mut frames: Vec<EncodedFrame>,
    audio: Option<AudioSegment>,
) -> RequestPayload {
    let mut parts = Vec::with_capacity(frames.len() + 3);

    if let Some(text) = context_text.map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(PayloadPart::Text(text.to_string()));
    }
    if let Some(note) = animation_note {
        parts.push(PayloadPart::Text(note));
    }

    frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    parts.extend(frames.into_iter().map(PayloadPart::Frame));

    if let Some(audio) = audio {
        parts.push(PayloadPart::Audio(audio));
    }

    RequestPayload { parts }
}
