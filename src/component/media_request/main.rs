use super::bundle_writer::write_request_bundle;
use super::checkpoint::{Checkpoint, CheckpointSink};
use super::frame_mode::FrameMode;
use super::options::{
    AudioBitrate, ClipWindow, DEFAULT_QUALITY, ImageEncoding, QualityPreset, RequestOptions, Resolution,
};
use super::pipeline::{LiveRequest, MediaRequestPipeline};
use super::report::DryRunReport;
use crate::config::Config;
use crate::config::save::{add_recent_path, save_settings};
use crate::tools::{ensure_directory_exists, validate_file_exists};
use anyhow::{Result, bail};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerMode {
    /// 只預估
    DryRun,
    /// 建構並輸出請求
    Build,
}

/// 多模態請求建構器（互動介面）
///
/// 流程：
/// A. 選擇媒體檔案
/// B. 選擇取樣模式、解析度、編碼、音訊
/// C. 預估或實際建構
/// D. 顯示結果，建構模式另外寫出請求資料夾
pub struct MediaRequestRunner {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
    mode: RunnerMode,
}

impl MediaRequestRunner {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>, mode: RunnerMode) -> Self {
        Self {
            config,
            shutdown_signal,
            mode,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let title = match self.mode {
            RunnerMode::DryRun => "=== 請求大小與費用預估 ===",
            RunnerMode::Build => "=== 建構多模態請求 ===",
        };
        println!("{}", style(title).cyan().bold());

        let Some(input_path) = self.prompt_input_path()? else {
            return Ok(());
        };
        let media_path = PathBuf::from(&input_path);
        validate_file_exists(&media_path)?;

        let mut options = self.prompt_options()?;
        options.dry_run = self.mode == RunnerMode::DryRun;

        let output_dir = match self.mode {
            RunnerMode::Build => Some(self.prompt_output_dir(&media_path)?),
            RunnerMode::DryRun => None,
        };

        if self.shutdown_signal.load(Ordering::SeqCst) {
            println!("{}", style("操作已中斷").yellow());
            return Ok(());
        }

        add_recent_path(&mut self.config.settings, &input_path);
        if let Err(e) = save_settings(&self.config.settings) {
            warn!("無法儲存最近使用路徑: {e:#}");
        }

        match output_dir {
            None => self.run_dry_run(&media_path, &options),
            Some(dir) => self.run_build(&media_path, &options, &dir),
        }
    }

    fn run_dry_run(&self, media_path: &Path, options: &RequestOptions) -> Result<()> {
        println!("{}", style("分析媒體中...").dim());
        let report = MediaRequestPipeline::new(options, &self.config.pricing).dry_run(media_path)?;
        self.print_dry_run(&report);
        Ok(())
    }

    fn run_build(&self, media_path: &Path, options: &RequestOptions, output_dir: &Path) -> Result<()> {
        let progress = ProgressSink::new();
        let live = MediaRequestPipeline::new(options, &self.config.pricing)
            .with_sink(&progress)
            .build(media_path);
        progress.finish();
        let live = live?;

        if self.shutdown_signal.load(Ordering::SeqCst) {
            println!("{}", style("操作已中斷，未寫出請求").yellow());
            return Ok(());
        }

        let manifest = write_request_bundle(&live, &options.model, output_dir)?;
        info!("請求已寫出: {}", manifest.display());
        self.print_live(&live, &manifest);
        Ok(())
    }

    fn prompt_input_path(&self) -> Result<Option<String>> {
        let recent_paths = &self.config.settings.recent_paths;

        if recent_paths.is_empty() {
            let path: String = Input::new()
                .with_prompt("請輸入動畫或影片檔案路徑")
                .interact_text()?;
            return Ok(Some(path.trim().to_string()));
        }

        let mut options: Vec<String> = recent_paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let indicator = if Path::new(p).is_file() { "✓" } else { "✗" };
                format!("{} [{}] {}", i + 1, indicator, p)
            })
            .collect();
        options.push("輸入新路徑...".to_string());

        println!("{}", style("(按 ESC 返回主選單)").dim());

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇檔案")
            .items(&options)
            .default(0)
            .interact_opt()?;

        match selection {
            None => Ok(None),
            Some(idx) if idx < recent_paths.len() => Ok(Some(recent_paths[idx].clone())),
            Some(_) => {
                let path: String = Input::new()
                    .with_prompt("請輸入動畫或影片檔案路徑")
                    .interact_text()?;
                Ok(Some(path.trim().to_string()))
            }
        }
    }

    fn prompt_options(&self) -> Result<RequestOptions> {
        let defaults = &self.config.settings.request;
        let theme = ColorfulTheme::default();

        let frame_mode = Self::prompt_frame_mode(&theme)?;
        let mut options = RequestOptions::new(frame_mode);

        options.resolution = Self::prompt_resolution(&theme, defaults.preset)?;

        let encoding_items: Vec<&str> = ImageEncoding::ALL.iter().map(|e| e.name()).collect();
        let encoding_default = ImageEncoding::ALL
            .iter()
            .position(|e| *e == defaults.encoding)
            .unwrap_or(0);
        let encoding_index = Select::with_theme(&theme)
            .with_prompt("影格編碼")
            .items(&encoding_items)
            .default(encoding_default)
            .interact()?;
        options.encoding = ImageEncoding::ALL[encoding_index];

        if options.encoding == ImageEncoding::Jpeg {
            options.quality = Input::with_theme(&theme)
                .with_prompt("JPEG 品質 (1-100)")
                .default(if defaults.quality == 0 { DEFAULT_QUALITY } else { defaults.quality })
                .validate_with(|q: &u8| -> Result<(), &str> {
                    if (1..=100).contains(q) { Ok(()) } else { Err("品質需介於 1 到 100") }
                })
                .interact_text()?;
        }

        let include_audio = Confirm::with_theme(&theme)
            .with_prompt("包含音訊？（動畫會自動略過）")
            .default(defaults.audio_enabled)
            .interact()?;
        if include_audio {
            let bitrate_items: Vec<String> =
                AudioBitrate::ALL.iter().map(ToString::to_string).collect();
            let bitrate_default = AudioBitrate::ALL
                .iter()
                .position(|b| b.kbps() == defaults.audio_bitrate_kbps)
                .unwrap_or(1);
            let bitrate_index = Select::with_theme(&theme)
                .with_prompt("音訊位元率")
                .items(&bitrate_items)
                .default(bitrate_default)
                .interact()?;
            options.audio = Some(AudioBitrate::ALL[bitrate_index]);
            options.clip = Self::prompt_clip(&theme)?;
        }

        let context_text: String = Input::with_theme(&theme)
            .with_prompt("前導文字（可留空）")
            .allow_empty(true)
            .interact_text()?;
        options.context_text = Some(context_text).filter(|t| !t.trim().is_empty());

        options.model = self.prompt_model(&theme)?;
        options.validate()?;
        Ok(options)
    }

    fn prompt_resolution(theme: &ColorfulTheme, default_preset: QualityPreset) -> Result<Resolution> {
        let mut items: Vec<String> = QualityPreset::ALL.iter().map(ToString::to_string).collect();
        items.push("自訂最長邊（像素）...".to_string());
        let default_index = QualityPreset::ALL
            .iter()
            .position(|p| *p == default_preset)
            .unwrap_or(1);
        let index = Select::with_theme(theme)
            .with_prompt("解析度")
            .items(&items)
            .default(default_index)
            .interact()?;

        if let Some(preset) = QualityPreset::ALL.get(index) {
            return Ok(Resolution::Preset(*preset));
        }

        let text: String = Input::with_theme(theme)
            .with_prompt("最長邊像素（例如 1024）")
            .validate_with(|text: &String| Resolution::parse(text).map(|_| ()))
            .interact_text()?;
        Ok(Resolution::parse(&text)?)
    }

    /// 只擷取部分音訊；不裁切時回傳 `None`
    fn prompt_clip(theme: &ColorfulTheme) -> Result<Option<ClipWindow>> {
        let clip_audio = Confirm::with_theme(theme)
            .with_prompt("只擷取部分音訊？")
            .default(false)
            .interact()?;
        if !clip_audio {
            return Ok(None);
        }

        let start: String = Input::with_theme(theme)
            .with_prompt("音訊起點（秒，留空為 0）")
            .allow_empty(true)
            .interact_text()?;
        let end: String = Input::with_theme(theme)
            .with_prompt("音訊終點（秒，留空到結尾）")
            .allow_empty(true)
            .validate_with(|end: &String| ClipWindow::parse(&start, end).map(|_| ()))
            .interact_text()?;
        Ok(Some(ClipWindow::parse(&start, &end)?))
    }

    fn prompt_frame_mode(theme: &ColorfulTheme) -> Result<FrameMode> {
        let modes = [
            ("total", "固定張數（平均分布）", 5.0),
            ("fps", "每秒張數", 1.0),
            ("interval", "固定間隔（秒）", 2.0),
        ];
        let items: Vec<&str> = modes.iter().map(|(_, label, _)| *label).collect();
        let index = Select::with_theme(theme)
            .with_prompt("取樣模式")
            .items(&items)
            .default(0)
            .interact()?;
        let (name, label, default_value) = modes[index];

        let value: f64 = Input::with_theme(theme)
            .with_prompt(label)
            .default(default_value)
            .interact_text()?;

        Ok(FrameMode::parse(name, value)?)
    }

    fn prompt_model(&self, theme: &ColorfulTheme) -> Result<String> {
        let models = self.config.pricing.model_names();
        if models.is_empty() {
            bail!("價格表沒有任何模型");
        }
        let default_index = models
            .iter()
            .position(|m| *m == self.config.settings.request.model)
            .unwrap_or(0);
        let index = Select::with_theme(theme)
            .with_prompt("模型")
            .items(&models)
            .default(default_index)
            .interact()?;
        Ok(models[index].to_string())
    }

    fn prompt_output_dir(&self, media_path: &Path) -> Result<PathBuf> {
        let stem = media_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("media");
        let parent = media_path.parent().unwrap_or(Path::new("."));
        let default_dir = parent.join(format!("{stem}.request"));

        let path: String = Input::new()
            .with_prompt("請輸入請求輸出資料夾路徑")
            .default(default_dir.display().to_string())
            .interact_text()?;
        let dir = PathBuf::from(path.trim());
        ensure_directory_exists(&dir)?;
        Ok(dir)
    }

    fn print_dry_run(&self, report: &DryRunReport) {
        println!();
        println!("{}", style("=== 預估結果 ===").cyan().bold());
        println!(
            "  影格: {} 張（{} {}），{}，{}，{:.2} MB",
            report.frames.count,
            report.frames.mode,
            report.frames.parameter,
            report.frames.resolution,
            report.frames.format,
            report.frames.size_mb
        );
        match &report.audio {
            Some(audio) => println!(
                "  音訊: {:.1}s @ {} kbps，{:.2} MB",
                audio.duration_sec, audio.bitrate_kbps, audio.size_mb
            ),
            None => println!("  音訊: {}", style("無").dim()),
        }
        println!(
            "  Tokens: {}（影格 {}，音訊 {}），模型 {}，約 ${:.6}",
            report.tokens.total,
            report.tokens.frames,
            report.tokens.audio,
            report.tokens.model,
            report.tokens.cost_usd
        );

        let usage = format!(
            "{:.2} MB（{:.1}%）",
            report.estimated_size_mb, report.usage_percent
        );
        if report.fits_in_limit {
            println!("  大小: {}", style(usage).green());
        } else {
            println!("  大小: {}", style(usage).red());
        }
        println!("  建議: {}", report.recommendation);
        self.print_warnings(report.warnings.iter().map(ToString::to_string));

        if let Ok(json) = serde_json::to_string_pretty(report) {
            println!();
            println!("{}", style(json).dim());
        }
    }

    fn print_live(&self, live: &LiveRequest, manifest: &Path) {
        println!();
        println!("{}", style("=== 建構完成 ===").cyan().bold());
        println!("  影格: {} 張", style(live.payload.frame_count()).green());
        match live.payload.audio() {
            Some(audio) => println!(
                "  音訊: {:.1}s @ {}，{} bytes",
                audio.duration_seconds,
                audio.bitrate,
                audio.bytes.len()
            ),
            None => println!(
                "  音訊: {}",
                style(live.audio_skipped.map_or_else(String::new, |r| r.to_string())).dim()
            ),
        }
        println!(
            "  大小: {:.2} MB（{:.1}%，預估 {:.2} MB）",
            live.actual.total_bytes as f64 / 1_000_000.0,
            live.actual.utilization_percent,
            live.predicted.total_bytes as f64 / 1_000_000.0
        );
        println!(
            "  Tokens: {}，模型 {}，約 ${:.6}",
            live.cost.total_tokens, live.cost.priced_model, live.cost.cost_usd
        );
        self.print_warnings(live.warnings.iter().map(ToString::to_string));
        println!("  輸出: {}", style(manifest.display()).cyan());
    }

    fn print_warnings(&self, warnings: impl Iterator<Item = String>) {
        for warning in warnings {
            println!("  {} {}", style("警告:").yellow(), warning);
        }
    }
}

/// 以進度條顯示影格編碼進度
struct ProgressSink {
    bar: ProgressBar,
}

impl ProgressSink {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(bar_style);
        bar.set_message("取樣與編碼中...");
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl CheckpointSink for ProgressSink {
    fn record(&self, checkpoint: &Checkpoint) {
        match checkpoint {
            Checkpoint::PlanResolved { frames, .. } => self.bar.set_length(*frames as u64),
            Checkpoint::FrameEncoded { .. } => self.bar.inc(1),
            Checkpoint::AudioExtracted { .. } => self.bar.set_message("音訊擷取完成"),
            Checkpoint::Completed { .. } => self.bar.set_message("完成"),
            _ => {}
        }
    }
}
