use super::frame_mode::FrameMode;
use super::size_budget::BudgetLimits;
use crate::error::{MediaError, MediaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 預設 JPEG 品質
pub const DEFAULT_QUALITY: u8 = 85;

/// 解析度預設值
///
/// 只影響最長邊的上限，`Original` 保留原始尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    #[serde(alias = "uhd")]
    Original,
    #[default]
    #[serde(alias = "fhd")]
    Large,
    #[serde(alias = "hd")]
    Medium,
    Balanced,
    Economy,
}

impl QualityPreset {
    pub const ALL: [Self; 5] = [
        Self::Original,
        Self::Large,
        Self::Medium,
        Self::Balanced,
        Self::Economy,
    ];

    #[must_use]
    pub const fn max_dimension(self) -> Option<u32> {
        match self {
            Self::Original => None,
            Self::Large => Some(1920),
            Self::Medium => Some(1280),
            Self::Balanced => Some(960),
            Self::Economy => Some(768),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Large => "large",
            Self::Medium => "medium",
            Self::Balanced => "balanced",
            Self::Economy => "economy",
        }
    }

    /// 依名稱查詢預設值（接受 uhd/fhd/hd 別名，大小寫不拘）
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "original" | "uhd" => Some(Self::Original),
            "large" | "fhd" => Some(Self::Large),
            "medium" | "hd" => Some(Self::Medium),
            "balanced" => Some(Self::Balanced),
            "economy" => Some(Self::Economy),
            _ => None,
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_dimension() {
            Some(px) => write!(f, "{} ({px}px)", self.name()),
            None => write!(f, "{} (no resize)", self.name()),
        }
    }
}

/// 輸出解析度：預設值名稱或直接指定最長邊像素
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Preset(QualityPreset),
    MaxDimension(u32),
}

impl Resolution {
    /// 解析 `large` 這類預設值名稱，或 `1024` 這類像素值
    pub fn parse(value: &str) -> MediaResult<Self> {
        if let Some(preset) = QualityPreset::from_name(value) {
            return Ok(Self::Preset(preset));
        }

        match value.trim().parse::<u32>() {
            Ok(0) => Err(MediaError::configuration(
                "max dimension must be a positive pixel count",
            )),
            Ok(px) => Ok(Self::MaxDimension(px)),
            Err(_) => Err(MediaError::configuration(format!(
                "unknown resolution preset: {value}"
            ))),
        }
    }

    #[must_use]
    pub const fn max_dimension(self) -> Option<u32> {
        match self {
            Self::Preset(preset) => preset.max_dimension(),
            Self::MaxDimension(px) => Some(px),
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Preset(QualityPreset::default())
    }
}

/// 影格編碼格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
}

impl ImageEncoding {
    pub const ALL: [Self; 3] = [Self::Jpeg, Self::Png, Self::Webp];

    pub fn parse(name: &str) -> MediaResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            other => Err(MediaError::configuration(format!(
                "unsupported image encoding: {other}"
            ))),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 音訊位元率（單聲道）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioBitrate {
    Kbps64,
    Kbps32,
    Kbps24,
}

impl AudioBitrate {
    pub const ALL: [Self; 3] = [Self::Kbps64, Self::Kbps32, Self::Kbps24];

    pub fn from_kbps(kbps: u32) -> MediaResult<Self> {
        match kbps {
            64 => Ok(Self::Kbps64),
            32 => Ok(Self::Kbps32),
            24 => Ok(Self::Kbps24),
            other => Err(MediaError::configuration(format!(
                "unsupported audio bitrate: {other} kbps (expected 64, 32 or 24)"
            ))),
        }
    }

    #[must_use]
    pub const fn kbps(self) -> u32 {
        match self {
            Self::Kbps64 => 64,
            Self::Kbps32 => 32,
            Self::Kbps24 => 24,
        }
    }
}

impl fmt::Display for AudioBitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kbps", self.kbps())
    }
}

/// 音訊擷取範圍 [start, end)，單位秒；`end` 為空代表到結尾
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub start: f64,
    pub end: Option<f64>,
}

impl ClipWindow {
    /// 由文字輸入建立，`end` 留空代表到結尾
    pub fn parse(start: &str, end: &str) -> MediaResult<Self> {
        let seconds = |label: &str, text: &str| {
            text.trim().parse::<f64>().map_err(|_| {
                MediaError::configuration(format!("clip {label} must be a number of seconds, got {text:?}"))
            })
        };

        let start = if start.trim().is_empty() { 0.0 } else { seconds("start", start)? };
        let end = if end.trim().is_empty() { None } else { Some(seconds("end", end)?) };

        let clip = Self { start, end };
        clip.validate()?;
        Ok(clip)
    }

    pub fn validate(&self) -> MediaResult<()> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(MediaError::configuration(format!(
                "clip start must be a non-negative number of seconds, got {}",
                self.start
            )));
        }
        if let Some(end) = self.end {
            if !end.is_finite() || end <= self.start {
                return Err(MediaError::configuration(format!(
                    "clip end ({end}) must be after clip start ({})",
                    self.start
                )));
            }
        }
        Ok(())
    }

    /// 依來源長度裁切，回傳 (起點, 長度)
    pub fn resolve(&self, duration: f64) -> MediaResult<(f64, f64)> {
        if self.start >= duration {
            return Err(MediaError::configuration(format!(
                "clip start {:.2}s is beyond the end of the source ({duration:.2}s)",
                self.start
            )));
        }
        let end = self.end.map_or(duration, |end| end.min(duration));
        Ok((self.start, end - self.start))
    }
}

/// 一次請求的完整參數
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub frame_mode: FrameMode,
    pub resolution: Resolution,
    pub encoding: ImageEncoding,
    pub quality: u8,
    /// `None` 代表停用音訊
    pub audio: Option<AudioBitrate>,
    pub clip: Option<ClipWindow>,
    pub context_text: Option<String>,
    pub model: String,
    pub dry_run: bool,
    pub limits: BudgetLimits,
}

impl RequestOptions {
    #[must_use]
    pub fn new(frame_mode: FrameMode) -> Self {
        Self {
            frame_mode,
            resolution: Resolution::default(),
            encoding: ImageEncoding::default(),
            quality: DEFAULT_QUALITY,
            audio: None,
            clip: None,
            context_text: None,
            model: "gemini-2.5-flash".to_string(),
            dry_run: false,
            limits: BudgetLimits::default(),
        }
    }

    /// 解碼前檢查所有參數
    pub fn validate(&self) -> MediaResult<()> {
        self.frame_mode.validate()?;

        if let Resolution::MaxDimension(0) = self.resolution {
            return Err(MediaError::configuration(
                "max dimension must be a positive pixel count",
            ));
        }

        if !(1..=100).contains(&self.quality) {
            return Err(MediaError::configuration(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }

        if let Some(clip) = &self.clip {
            clip.validate()?;
        }

        if self.model.trim().is_empty() {
            return Err(MediaError::configuration("model name must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_table() {
        assert_eq!(QualityPreset::Original.max_dimension(), None);
        assert_eq!(QualityPreset::Large.max_dimension(), Some(1920));
        assert_eq!(QualityPreset::Medium.max_dimension(), Some(1280));
        assert_eq!(QualityPreset::Balanced.max_dimension(), Some(960));
        assert_eq!(QualityPreset::Economy.max_dimension(), Some(768));
    }

    #[test]
    fn test_preset_aliases() {
        assert_eq!(QualityPreset::from_name("uhd"), Some(QualityPreset::Original));
        assert_eq!(QualityPreset::from_name("FHD"), Some(QualityPreset::Large));
        assert_eq!(QualityPreset::from_name(" hd "), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::from_name("huge"), None);
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!(
            Resolution::parse("balanced").unwrap(),
            Resolution::Preset(QualityPreset::Balanced)
        );
        assert_eq!(Resolution::parse("1024").unwrap(), Resolution::MaxDimension(1024));
        assert!(matches!(
            Resolution::parse("0"),
            Err(MediaError::Configuration(_))
        ));
        assert!(matches!(
            Resolution::parse("huge"),
            Err(MediaError::Configuration(_))
        ));
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!(ImageEncoding::parse("JPG").unwrap(), ImageEncoding::Jpeg);
        assert_eq!(ImageEncoding::parse("webp").unwrap(), ImageEncoding::Webp);
        assert!(ImageEncoding::parse("tiff").is_err());
    }

    #[test]
    fn test_audio_bitrate_closed_set() {
        assert_eq!(AudioBitrate::from_kbps(32).unwrap().kbps(), 32);
        assert!(AudioBitrate::from_kbps(128).is_err());
    }

    #[test]
    fn test_clip_window_resolve() {
        let clip = ClipWindow {
            start: 10.0,
            end: Some(500.0),
        };
        let (start, length) = clip.resolve(120.0).unwrap();
        assert!((start - 10.0).abs() < 1e-9);
        assert!((length - 110.0).abs() < 1e-9);

        let late = ClipWindow {
            start: 200.0,
            end: None,
        };
        assert!(matches!(
            late.resolve(120.0),
            Err(MediaError::Configuration(_))
        ));
    }

    #[test]
    fn test_clip_window_validate() {
        let reversed = ClipWindow {
            start: 5.0,
            end: Some(2.0),
        };
        assert!(reversed.validate().is_err());

        let negative = ClipWindow {
            start: -1.0,
            end: None,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_clip_window_parse_text() {
        let clip = ClipWindow::parse("1.5", " 4 ").unwrap();
        assert!((clip.start - 1.5).abs() < 1e-9);
        assert_eq!(clip.end, Some(4.0));

        let open = ClipWindow::parse("", "").unwrap();
        assert_eq!(open, ClipWindow { start: 0.0, end: None });

        assert!(matches!(
            ClipWindow::parse("abc", ""),
            Err(MediaError::Configuration(_))
        ));
        assert!(ClipWindow::parse("6", "3").is_err());
    }

    #[test]
    fn test_options_validate_quality() {
        let mut options = RequestOptions::new(FrameMode::Total(5));
        assert!(options.validate().is_ok());

        options.quality = 0;
        assert!(matches!(
            options.validate(),
            Err(MediaError::Configuration(_))
        ));
    }

    #[test]
    fn test_options_validate_frame_mode_first() {
        let options = RequestOptions::new(FrameMode::Fps(0.0));
        assert!(matches!(
            options.validate(),
            Err(MediaError::Configuration(_))
        ));
    }
}
