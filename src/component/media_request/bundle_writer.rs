//! 將組裝好的請求寫入資料夾，交給負責網路呼叫的程式
//!
//! 輸出：`frame_NNN.<ext>`、`audio.ogg`、`request.json`

use super::pipeline::LiveRequest;
use super::request_assembler::PayloadPart;
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "request.json";
pub const AUDIO_FILE: &str = "audio.ogg";

/// 寫出請求內容，回傳 manifest 路徑
pub fn write_request_bundle(request: &LiveRequest, model: &str, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("無法建立輸出資料夾: {}", output_dir.display()))?;

    let mut parts = Vec::with_capacity(request.payload.parts().len());
    let mut frame_index = 0usize;

    for part in request.payload.parts() {
        let entry = match part {
            PayloadPart::Text(text) => json!({ "type": "text", "text": text }),
            PayloadPart::Frame(frame) => {
                let file_name = format!("frame_{frame_index:03}.{}", frame.encoding.extension());
                frame_index += 1;
                write_file(&output_dir.join(&file_name), &frame.bytes)?;
                json!({
                    "type": "image",
                    "file": file_name,
                    "mime_type": frame.encoding.mime_type(),
                    "timestamp": frame.timestamp,
                    "width": frame.width,
                    "height": frame.height,
                })
            }
            PayloadPart::Audio(audio) => {
                write_file(&output_dir.join(AUDIO_FILE), &audio.bytes)?;
                json!({
                    "type": "audio",
                    "file": AUDIO_FILE,
                    "mime_type": audio.mime_type,
                    "duration_sec": audio.duration_seconds,
                    "bitrate_kbps": audio.bitrate.kbps(),
                    "channels": audio.channels,
                })
            }
        };
        parts.push(entry);
    }

    let manifest: Value = json!({
        "model": model,
        "parts": parts,
        "cost": request.cost,
        "size": request.actual,
        "predicted_size": request.predicted,
        "calibration": request.calibration,
        "checkpoints": request.checkpoints,
    });

    let manifest_path = output_dir.join(MANIFEST_FILE);
    let content = serde_json::to_string_pretty(&manifest).context("無法序列化請求內容")?;
    write_file(&manifest_path, content.as_bytes())?;

    Ok(manifest_path)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("無法寫入檔案: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::media_request::audio_extractor::{AUDIO_MIME_TYPE, AudioSegment};
    use crate::component::media_request::image_transform::EncodedFrame;
    use crate::component::media_request::options::{AudioBitrate, ImageEncoding};
    use crate::component::media_request::request_assembler::assemble_request;
    use crate::component::media_request::size_budget::{
        BudgetLimits, SizeCalibration, evaluate_size,
    };
    use crate::component::media_request::token_cost::CostEstimate;
    use tempfile::tempdir;

    fn live_request() -> LiveRequest {
        let frames = (0..2)
            .map(|i| EncodedFrame {
                timestamp: f64::from(i),
                bytes: vec![i as u8; 4],
                encoding: ImageEncoding::Png,
                width: 2,
                height: 2,
            })
            .collect();
        let audio = AudioSegment {
            bytes: vec![9; 6],
            duration_seconds: 2.0,
            bitrate: AudioBitrate::Kbps24,
            channels: 1,
            mime_type: AUDIO_MIME_TYPE,
        };
        let payload = assemble_request(Some("hello"), None, frames, Some(audio));
        let size = evaluate_size(13, 6, &BudgetLimits::default());

        LiveRequest {
            payload,
            cost: CostEstimate {
                per_frame: Vec::new(),
                audio_tokens: 64,
                total_tokens: 580,
                cost_usd: 0.0,
                priced_model: "gemini-2.5-flash".to_string(),
                warnings: Vec::new(),
            },
            predicted: size.clone(),
            actual: size,
            calibration: SizeCalibration::new(8, 8),
            audio_skipped: None,
            warnings: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    #[test]
    fn test_write_request_bundle() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("bundle");

        let manifest_path = write_request_bundle(&live_request(), "gemini-2.5-flash", &output).unwrap();

        assert!(output.join("frame_000.png").exists());
        assert!(output.join("frame_001.png").exists());
        assert_eq!(fs::read(output.join(AUDIO_FILE)).unwrap(), vec![9; 6]);

        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();
        let parts = manifest["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["file"], "frame_000.png");
        assert_eq!(parts[3]["type"], "audio");
        assert_eq!(manifest["cost"]["total_tokens"], 580);
    }
}
