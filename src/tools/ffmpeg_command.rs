use std::path::Path;
use std::process::Command;

/// 兩段式 seek 的前置緩衝時間（秒）
pub const SEEK_MARGIN: f64 = 2.0;

/// ffmpeg 指令，輸出一律走 stdout（pipe:1）
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    args: Vec<String>,
}

impl FfmpegCommand {
    /// 擷取單一影格並以 PNG 輸出
    ///
    /// 兩段式 seek：
    /// 1. `-ss` 在 `-i` 前：快速跳轉到最近的關鍵幀
    /// 2. `-ss` 在 `-i` 後：精準解碼到目標時間點
    #[must_use]
    pub fn frame_grab(source_path: &Path, timestamp: f64) -> Self {
        let t0 = (timestamp - SEEK_MARGIN).max(0.0);
        let delta = timestamp - t0;

        let mut args = Self::common_args();

        if t0 > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{t0:.3}"));
        }

        args.push("-i".to_string());
        args.push(format!("file:{}", source_path.display()));

        if delta > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{delta:.3}"));
        }

        args.extend(
            [
                "-map", "0:v:0", "-frames:v", "1", "-an", "-sn", "-dn", "-threads", "1",
                "-f", "image2pipe", "-c:v", "png", "pipe:1",
            ]
            .map(String::from),
        );

        Self { args }
    }

    /// 轉出單聲道 Ogg/Vorbis 音訊
    #[must_use]
    pub fn audio_transcode(
        source_path: &Path,
        bitrate_kbps: u32,
        start: f64,
        duration: f64,
    ) -> Self {
        let mut args = Self::common_args();

        if start > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{start:.3}"));
        }

        args.push("-i".to_string());
        args.push(format!("file:{}", source_path.display()));

        args.push("-t".to_string());
        args.push(format!("{duration:.3}"));

        args.extend(
            [
                "-map", "0:a:0", "-vn", "-sn", "-dn", "-ac", "1", "-c:a", "libvorbis",
            ]
            .map(String::from),
        );
        args.push("-b:a".to_string());
        args.push(format!("{bitrate_kbps}k"));
        args.extend(["-f", "ogg", "pipe:1"].map(String::from));

        Self { args }
    }

    fn common_args() -> Vec<String> {
        ["-hide_banner", "-nostdin", "-loglevel", "error"]
            .map(String::from)
            .to_vec()
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(&self.args);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], value: &str) -> Option<usize> {
        args.iter().position(|a| a == value)
    }

    #[test]
    fn test_frame_grab_two_stage_seek() {
        let cmd = FfmpegCommand::frame_grab(Path::new("/videos/a.mp4"), 10.0);
        let args = cmd.args();

        let input = position(args, "-i").unwrap();
        assert_eq!(args[input + 1], "file:/videos/a.mp4");
        assert_eq!(args[input - 2], "-ss");
        assert_eq!(args[input - 1], "8.000");
        assert_eq!(args[input + 2], "-ss");
        assert_eq!(args[input + 3], "2.000");
        assert_eq!(args.last().unwrap(), "pipe:1");
    }

    #[test]
    fn test_frame_grab_near_start_skips_input_seek() {
        let cmd = FfmpegCommand::frame_grab(Path::new("a.mp4"), 1.5);
        let args = cmd.args();

        let input = position(args, "-i").unwrap();
        assert_ne!(args[input - 2], "-ss");
        assert_eq!(args[input + 3], "1.500");
    }

    #[test]
    fn test_frame_grab_at_zero_has_no_seek() {
        let cmd = FfmpegCommand::frame_grab(Path::new("a.mp4"), 0.0);
        assert!(position(cmd.args(), "-ss").is_none());
    }

    #[test]
    fn test_audio_transcode_args() {
        let cmd = FfmpegCommand::audio_transcode(Path::new("a.mkv"), 32, 0.0, 600.0);
        let args = cmd.args();

        assert!(position(args, "-ss").is_none());
        let bitrate = position(args, "-b:a").unwrap();
        assert_eq!(args[bitrate + 1], "32k");
        let channels = position(args, "-ac").unwrap();
        assert_eq!(args[channels + 1], "1");
        let length = position(args, "-t").unwrap();
        assert_eq!(args[length + 1], "600.000");
        assert!(position(args, "libvorbis").is_some());
    }

    #[test]
    fn test_audio_transcode_with_clip_start() {
        let cmd = FfmpegCommand::audio_transcode(Path::new("a.mkv"), 64, 30.0, 15.0);
        let args = cmd.args();

        let seek = position(args, "-ss").unwrap();
        assert_eq!(args[seek + 1], "30.000");
        assert!(seek < position(args, "-i").unwrap());
    }
}
