//! 取樣時間點解析
//!
//! 三種模式：固定張數、每秒張數、固定間隔。
//! 時間點一律以 `k * step` 計算，不累加，避免浮點誤差漂移。

use super::media_source::SourceMetadata;
use crate::error::{MediaError, MediaResult};
use serde::Serialize;
use std::fmt;

/// 兩個時間點視為相同的容許誤差（秒）
const TIMESTAMP_EPSILON: f64 = 1e-9;

/// `total` 模式可要求的最大張數
pub const MAX_TOTAL_FRAMES: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum FrameMode {
    /// 固定取 N 張，平均分布
    Total(u32),
    /// 每秒 F 張
    Fps(f64),
    /// 每 S 秒一張
    Interval(f64),
}

impl FrameMode {
    /// 由模式名稱與數值建立，`total` 需要正整數
    pub fn parse(name: &str, value: f64) -> MediaResult<Self> {
        let mode = match name.trim().to_ascii_lowercase().as_str() {
            "total" => {
                if !value.is_finite() || value.fract() != 0.0 || value < 1.0 {
                    return Err(MediaError::configuration(format!(
                        "total frame count must be a positive integer, got {value}"
                    )));
                }
                if value > f64::from(MAX_TOTAL_FRAMES) {
                    return Err(MediaError::configuration(format!(
                        "total frame count is too large: {value} (maximum {MAX_TOTAL_FRAMES})"
                    )));
                }
                Self::Total(value as u32)
            }
            "fps" => Self::Fps(value),
            "interval" => Self::Interval(value),
            other => {
                return Err(MediaError::configuration(format!(
                    "unknown frame mode: {other} (expected total, fps or interval)"
                )));
            }
        };
        mode.validate()?;
        Ok(mode)
    }

    pub fn validate(&self) -> MediaResult<()> {
        match *self {
            Self::Total(0) => Err(MediaError::configuration(
                "total frame count must be positive",
            )),
            Self::Total(count) if count > MAX_TOTAL_FRAMES => {
                Err(MediaError::configuration(format!(
                    "total frame count is too large: {count} (maximum {MAX_TOTAL_FRAMES})"
                )))
            }
            Self::Fps(rate) if !rate.is_finite() || rate <= 0.0 => Err(
                MediaError::configuration(format!("fps must be a positive number, got {rate}")),
            ),
            Self::Interval(seconds) if !seconds.is_finite() || seconds <= 0.0 => {
                Err(MediaError::configuration(format!(
                    "interval must be a positive number of seconds, got {seconds}"
                )))
            }
            _ => Ok(()),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Total(_) => "total",
            Self::Fps(_) => "fps",
            Self::Interval(_) => "interval",
        }
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        match *self {
            Self::Total(count) => f64::from(count),
            Self::Fps(rate) => rate,
            Self::Interval(seconds) => seconds,
        }
    }
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Total(count) => write!(f, "total={count}"),
            Self::Fps(rate) => write!(f, "fps={rate}"),
            Self::Interval(seconds) => write!(f, "interval={seconds}s"),
        }
    }
}

/// 解析完成的取樣計畫
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPlan {
    pub mode: FrameMode,
    /// 非遞減、已去重、落在 [0, duration)
    pub timestamps: Vec<f64>,
}

impl ExtractionPlan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// 實際取樣率（張/秒）
    #[must_use]
    pub fn effective_rate(&self, duration: f64) -> f64 {
        if duration > 0.0 {
            self.len() as f64 / duration
        } else {
            0.0
        }
    }
}

/// 依模式與來源資訊產生取樣時間點
pub fn resolve_plan(mode: FrameMode, source: &SourceMetadata) -> MediaResult<ExtractionPlan> {
    mode.validate()?;

    let duration = source.duration_seconds;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::decode(&source.name, "source has zero duration"));
    }

    let raw = match mode {
        FrameMode::Total(count) => total_timestamps(count, duration, source.frame_cap()),
        FrameMode::Fps(rate) => rate_timestamps(rate, 1.0 / rate, source),
        FrameMode::Interval(seconds) => rate_timestamps(1.0 / seconds, seconds, source),
    };

    let timestamps = normalize_timestamps(raw, duration);
    if timestamps.is_empty() {
        return Err(MediaError::decode(
            &source.name,
            format!("no sample points could be placed within {duration:.3}s"),
        ));
    }

    log::debug!(
        "取樣計畫 {}: {} 個時間點（來源長度 {:.2}s）",
        mode,
        timestamps.len(),
        duration
    );

    Ok(ExtractionPlan { mode, timestamps })
}

/// 平均分布：第 k 點為 k * duration / n
#[must_use]
fn total_timestamps(count: u32, duration: f64, frame_cap: Option<u64>) -> Vec<f64> {
    let requested = u64::from(count);
    let count = frame_cap.map_or(requested, |cap| requested.min(cap.max(1)));
    let step = duration / count as f64;

    (0..count).map(|k| k as f64 * step).collect()
}

/// 固定速率取樣；超過原生速率時改為每個原生影格各取一次
#[must_use]
fn rate_timestamps(rate: f64, step: f64, source: &SourceMetadata) -> Vec<f64> {
    if source.native_fps > 0.0 && rate > source.native_fps {
        return source.native_frame_timestamps();
    }
    stepped_timestamps(step, source.duration_seconds)
}

#[must_use]
pub(crate) fn stepped_timestamps(step: f64, duration: f64) -> Vec<f64> {
    (0u64..)
        .map(|k| k as f64 * step)
        .take_while(|t| *t < duration)
        .collect()
}

/// 排序、去重並移除超出範圍的時間點
#[must_use]
fn normalize_timestamps(mut timestamps: Vec<f64>, duration: f64) -> Vec<f64> {
    timestamps.retain(|t| t.is_finite() && *t >= 0.0 && *t < duration);
    timestamps.sort_by(f64::total_cmp);
    timestamps.dedup_by(|a, b| (*a - *b).abs() < TIMESTAMP_EPSILON);
    timestamps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::media_request::media_source::SourceKind;

    fn video(duration: f64, fps: f64) -> SourceMetadata {
        SourceMetadata {
            name: "clip.mp4".to_string(),
            kind: SourceKind::Video,
            duration_seconds: duration,
            native_fps: fps,
            frame_count: (duration * fps).round() as u64,
            has_audio: true,
            width: 1920,
            height: 1080,
            frame_starts: Vec::new(),
        }
    }

    fn animation(delays: &[f64]) -> SourceMetadata {
        let mut starts = Vec::new();
        let mut elapsed = 0.0;
        for delay in delays {
            starts.push(elapsed);
            elapsed += delay;
        }
        SourceMetadata {
            name: "loop.gif".to_string(),
            kind: SourceKind::Animated,
            duration_seconds: elapsed,
            native_fps: delays.len() as f64 / elapsed,
            frame_count: delays.len() as u64,
            has_audio: false,
            width: 480,
            height: 270,
            frame_starts: starts,
        }
    }

    #[test]
    fn test_total_evenly_spaced() {
        let plan = resolve_plan(FrameMode::Total(4), &video(10.0, 30.0)).unwrap();

        assert_eq!(plan.len(), 4);
        let expected = [0.0, 2.5, 5.0, 7.5];
        for (t, e) in plan.timestamps.iter().zip(expected) {
            assert!((t - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_total_strictly_increasing_within_duration() {
        let plan = resolve_plan(FrameMode::Total(54), &video(3600.0, 24.0)).unwrap();

        assert_eq!(plan.len(), 54);
        for pair in plan.timestamps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!(plan.timestamps.iter().all(|t| *t >= 0.0 && *t < 3600.0));
    }

    #[test]
    fn test_total_capped_by_animation_frame_count() {
        let source = animation(&[0.1, 0.1, 0.1]);
        let plan = resolve_plan(FrameMode::Total(10), &source).unwrap();
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_total_capped_at_video_frame_count() {
        let plan = resolve_plan(FrameMode::Total(100), &video(2.0, 10.0)).unwrap();
        assert_eq!(plan.len(), 20);

        let plan = resolve_plan(FrameMode::Total(MAX_TOTAL_FRAMES), &video(10.0, 30.0)).unwrap();
        assert_eq!(plan.len(), 300);
        assert!((plan.timestamps[1] - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_above_maximum_rejected() {
        let result = resolve_plan(FrameMode::Total(20_000_000), &video(10.0, 30.0));
        assert!(matches!(result, Err(MediaError::Configuration(_))));
        assert!(FrameMode::parse("total", 20_000_000.0).is_err());
        assert!(FrameMode::parse("total", f64::from(MAX_TOTAL_FRAMES)).is_ok());
    }

    #[test]
    fn test_total_without_known_frame_count_is_uncapped() {
        let mut source = video(2.0, 10.0);
        source.frame_count = 0;
        let plan = resolve_plan(FrameMode::Total(50), &source).unwrap();
        assert_eq!(plan.len(), 50);
    }

    #[test]
    fn test_fps_spacing() {
        let plan = resolve_plan(FrameMode::Fps(0.5), &video(600.0, 30.0)).unwrap();

        assert_eq!(plan.len(), 300);
        for pair in plan.timestamps.windows(2) {
            assert!((pair[1] - pair[0] - 2.0).abs() < 1e-9);
        }
        assert!((plan.timestamps[299] - 598.0).abs() < 1e-9);
    }

    #[test]
    fn test_fps_no_accumulated_drift() {
        let plan = resolve_plan(FrameMode::Fps(3.0), &video(1000.0, 30.0)).unwrap();
        let last = *plan.timestamps.last().unwrap();
        assert!((last - (plan.len() - 1) as f64 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fps_above_native_samples_each_animation_frame_once() {
        let source = animation(&[0.5, 0.25, 0.25, 1.0]);
        let plan = resolve_plan(FrameMode::Fps(60.0), &source).unwrap();

        assert_eq!(plan.timestamps, vec![0.0, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_fps_above_native_video_uses_native_rate() {
        let plan = resolve_plan(FrameMode::Fps(120.0), &video(1.0, 24.0)).unwrap();
        assert_eq!(plan.len(), 24);
    }

    #[test]
    fn test_interval_matches_inverse_fps() {
        let source = video(95.0, 25.0);
        let by_interval = resolve_plan(FrameMode::Interval(10.0), &source).unwrap();
        let by_fps = resolve_plan(FrameMode::Fps(0.1), &source).unwrap();

        assert_eq!(by_interval.len(), 10);
        assert_eq!(by_interval.timestamps, by_fps.timestamps);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let source = video(10.0, 30.0);
        for mode in [
            FrameMode::Total(0),
            FrameMode::Fps(0.0),
            FrameMode::Fps(-1.0),
            FrameMode::Fps(f64::NAN),
            FrameMode::Interval(0.0),
            FrameMode::Interval(f64::INFINITY),
        ] {
            assert!(matches!(
                resolve_plan(mode, &source),
                Err(MediaError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_zero_duration_is_decode_error() {
        let source = video(0.0, 30.0);
        assert!(matches!(
            resolve_plan(FrameMode::Total(5), &source),
            Err(MediaError::Decode { .. })
        ));
    }

    #[test]
    fn test_parse_mode_names() {
        assert_eq!(FrameMode::parse("total", 5.0).unwrap(), FrameMode::Total(5));
        assert_eq!(FrameMode::parse("FPS", 0.5).unwrap(), FrameMode::Fps(0.5));
        assert_eq!(
            FrameMode::parse("interval", 2.0).unwrap(),
            FrameMode::Interval(2.0)
        );
        assert!(FrameMode::parse("total", 2.5).is_err());
        assert!(FrameMode::parse("scene", 1.0).is_err());
    }

    #[test]
    fn test_stepped_timestamps_edge() {
        assert!(stepped_timestamps(1.0, 0.0).is_empty());
        assert_eq!(stepped_timestamps(1.0, 3.0), vec![0.0, 1.0, 2.0]);
    }
}
