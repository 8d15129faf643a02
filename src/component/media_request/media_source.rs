//! 媒體來源：辨識容器類型並保存這次呼叫所需的解碼狀態

use super::animated_image::AnimatedImage;
use super::frame_mode::stepped_timestamps;
use crate::error::{MediaError, MediaResult};
use crate::tools::get_media_info;
use image::{DynamicImage, ImageFormat};
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// 靜態圖片視為單一影格的長度（秒）
pub const STILL_FRAME_SECONDS: f64 = 0.1;

/// 判斷格式所需的檔頭長度
const SNIFF_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// 多影格動畫（GIF）
    Animated,
    /// 單張靜態圖片
    Still,
    Video,
}

impl SourceKind {
    /// 是否以離散影格為單位（動畫或靜態圖）
    #[must_use]
    pub const fn is_frame_based(self) -> bool {
        matches!(self, Self::Animated | Self::Still)
    }
}

/// 來源的描述資訊，取樣與預估都只依賴這份資料
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    pub name: String,
    pub kind: SourceKind,
    pub duration_seconds: f64,
    pub native_fps: f64,
    pub frame_count: u64,
    pub has_audio: bool,
    pub width: u32,
    pub height: u32,
    /// 動畫每個影格的起始時間；影片為空
    pub frame_starts: Vec<f64>,
}

impl SourceMetadata {
    /// `total` 模式的張數上限：來源的實際影格數，未知（0）時不設限
    #[must_use]
    pub fn frame_cap(&self) -> Option<u64> {
        (self.frame_count > 0).then_some(self.frame_count)
    }

    /// 每個原生影格的起始時間
    #[must_use]
    pub fn native_frame_timestamps(&self) -> Vec<f64> {
        if self.kind.is_frame_based() {
            return self.frame_starts.clone();
        }
        if self.native_fps > 0.0 {
            return stepped_timestamps(1.0 / self.native_fps, self.duration_seconds);
        }
        Vec::new()
    }
}

pub(crate) enum SourceContent {
    Animated(AnimatedImage),
    Still(DynamicImage),
    Video,
}

/// 已開啟的媒體來源，由單次呼叫獨佔，離開作用域即釋放
pub struct MediaSource {
    path: PathBuf,
    metadata: SourceMetadata,
    content: SourceContent,
}

impl MediaSource {
    pub fn open(path: &Path) -> MediaResult<Self> {
        let name = display_name(path);
        let format = sniff_image_format(path, &name)?;

        let (metadata, content) = match format {
            Some(ImageFormat::Gif) => open_animation(path, &name)?,
            Some(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP | ImageFormat::Bmp) => {
                open_still(path, &name)?
            }
            _ => open_video(path, &name)?,
        };

        info!(
            "開啟來源 {} ({:?}): {}x{}, {:.2}s, {} 影格, 音訊: {}",
            metadata.name,
            metadata.kind,
            metadata.width,
            metadata.height,
            metadata.duration_seconds,
            metadata.frame_count,
            metadata.has_audio
        );

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            content,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    pub(crate) const fn content(&self) -> &SourceContent {
        &self.content
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}

/// 以檔頭判斷是否為已知圖片格式；無法辨識時交給 ffprobe
fn sniff_image_format(path: &Path, name: &str) -> MediaResult<Option<ImageFormat>> {
    let mut file =
        File::open(path).map_err(|e| MediaError::decode(name, format!("cannot open file: {e}")))?;

    let mut header = Vec::with_capacity(SNIFF_BYTES);
    file.by_ref()
        .take(SNIFF_BYTES as u64)
        .read_to_end(&mut header)
        .map_err(|e| MediaError::decode(name, format!("cannot read file header: {e}")))?;

    if header.is_empty() {
        return Err(MediaError::decode(name, "file is empty"));
    }

    let format = image::guess_format(&header).ok();
    debug!("檔頭判斷 {name}: {format:?}");
    Ok(format)
}

fn open_animation(path: &Path, name: &str) -> MediaResult<(SourceMetadata, SourceContent)> {
    let file =
        File::open(path).map_err(|e| MediaError::decode(name, format!("cannot open file: {e}")))?;
    let animation = AnimatedImage::decode(BufReader::new(file))
        .map_err(|e| MediaError::decode(name, format!("corrupt GIF: {e}")))?;

    if animation.frame_count() == 0 {
        return Err(MediaError::decode(name, "GIF contains no frames"));
    }

    let duration_seconds = animation.duration_seconds();
    let frame_count = animation.frame_count() as u64;
    let kind = if frame_count > 1 {
        SourceKind::Animated
    } else {
        SourceKind::Still
    };

    let metadata = SourceMetadata {
        name: name.to_string(),
        kind,
        duration_seconds,
        native_fps: frame_count as f64 / duration_seconds,
        frame_count,
        has_audio: false,
        width: u32::from(animation.width()),
        height: u32::from(animation.height()),
        frame_starts: animation.frame_starts(),
    };

    Ok((metadata, SourceContent::Animated(animation)))
}

fn open_still(path: &Path, name: &str) -> MediaResult<(SourceMetadata, SourceContent)> {
    let bytes =
        std::fs::read(path).map_err(|e| MediaError::decode(name, format!("cannot read file: {e}")))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| MediaError::decode(name, format!("corrupt image: {e}")))?;

    let metadata = SourceMetadata {
        name: name.to_string(),
        kind: SourceKind::Still,
        duration_seconds: STILL_FRAME_SECONDS,
        native_fps: 1.0 / STILL_FRAME_SECONDS,
        frame_count: 1,
        has_audio: false,
        width: image.width(),
        height: image.height(),
        frame_starts: vec![0.0],
    };

    Ok((metadata, SourceContent::Still(image)))
}

fn open_video(path: &Path, name: &str) -> MediaResult<(SourceMetadata, SourceContent)> {
    let info = get_media_info(path).map_err(|e| MediaError::decode(name, format!("{e:#}")))?;

    let frame_count = info
        .frame_count
        .unwrap_or_else(|| (info.duration_seconds * info.frame_rate).round().max(0.0) as u64);

    let metadata = SourceMetadata {
        name: name.to_string(),
        kind: SourceKind::Video,
        duration_seconds: info.duration_seconds,
        native_fps: info.frame_rate,
        frame_count,
        has_audio: info.has_audio,
        width: info.width,
        height: info.height,
        frame_starts: Vec::new(),
    };

    Ok((metadata, SourceContent::Video))
}
