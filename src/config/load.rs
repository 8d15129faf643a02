use crate::config::types::{Config, PricingTable, UserSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 編譯時嵌入的模型價格表（不需要外部檔案）
const MODEL_PRICING_JSON: &str = include_str!("../data/model_pricing.json");

const SETTINGS_FILE: &str = "settings.json";

impl Config {
    pub fn new() -> Result<Self> {
        let pricing = Self::load_embedded_pricing()?;
        let settings = Self::load_settings(Path::new(SETTINGS_FILE)).unwrap_or_else(|e| {
            log::warn!("無法讀取設定檔，使用預設值: {e:#}");
            UserSettings::default()
        });

        Ok(Self { pricing, settings })
    }

    /// 重新讀取設定檔（元件可能已寫入最近路徑），失敗時保留目前設定
    pub fn reload_settings(&mut self) {
        match Self::load_settings(Path::new(SETTINGS_FILE)) {
            Ok(settings) => self.settings = settings,
            Err(e) => log::warn!("無法重新讀取設定檔: {e:#}"),
        }
    }

    pub(crate) fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }

    /// 從編譯時嵌入的 JSON 載入價格表
    pub fn load_embedded_pricing() -> Result<PricingTable> {
        serde_json::from_str(MODEL_PRICING_JSON).context("無法解析嵌入的模型價格表")
    }
}
