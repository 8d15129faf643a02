use crate::component::media_request::{ImageEncoding, QualityPreset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 最近使用路徑的保留數量
pub const MAX_RECENT_PATHS: usize = 8;

/// 單一模型的價格（每 1K tokens，美元）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_1k_tokens: f64,
    pub output_per_1k_tokens: f64,
}

/// 模型價格表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTable {
    pub default_model: String,
    pub models: BTreeMap<String, ModelPrice>,
}

impl PricingTable {
    /// 查詢模型價格，未知模型退回預設模型
    ///
    /// 回傳實際計價的模型名稱與價格；預設模型也不存在時回傳 `None`
    #[must_use]
    pub fn resolve(&self, model: &str) -> Option<(&str, ModelPrice)> {
        self.models
            .get_key_value(model)
            .or_else(|| self.models.get_key_value(self.default_model.as_str()))
            .map(|(name, price)| (name.as_str(), *price))
    }

    #[must_use]
    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 請求預設值（互動介面的初始選項）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub model: String,
    pub preset: QualityPreset,
    pub encoding: ImageEncoding,
    pub quality: u8,
    pub audio_enabled: bool,
    pub audio_bitrate_kbps: u32,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            preset: QualityPreset::default(),
            encoding: ImageEncoding::default(),
            quality: 85,
            audio_enabled: true,
            audio_bitrate_kbps: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    pub request: RequestDefaults,
    pub recent_paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pricing: PricingTable,
    pub settings: UserSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> PricingTable {
        let mut models = BTreeMap::new();
        models.insert(
            "gemini-2.5-flash".to_string(),
            ModelPrice {
                input_per_1k_tokens: 0.00001875,
                output_per_1k_tokens: 0.000075,
            },
        );
        models.insert(
            "gemini-2.5-pro".to_string(),
            ModelPrice {
                input_per_1k_tokens: 0.00125,
                output_per_1k_tokens: 0.005,
            },
        );
        PricingTable {
            default_model: "gemini-2.5-flash".to_string(),
            models,
        }
    }

    #[test]
    fn test_resolve_known_model() {
        let table = sample_table();
        let (name, price) = table.resolve("gemini-2.5-pro").unwrap();
        assert_eq!(name, "gemini-2.5-pro");
        assert!((price.input_per_1k_tokens - 0.00125).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_unknown_model_falls_back() {
        let table = sample_table();
        let (name, _) = table.resolve("some-future-model").unwrap();
        assert_eq!(name, "gemini-2.5-flash");
    }

    #[test]
    fn test_resolve_without_default_entry() {
        let mut table = sample_table();
        table.default_model = "missing".to_string();
        assert!(table.resolve("unknown").is_none());
    }

    #[test]
    fn test_settings_deserialize_partial_json() {
        let settings: UserSettings = serde_json::from_str(r#"{"language":"zh-TW"}"#).unwrap();
        assert_eq!(settings.language, Language::ZhTw);
        assert_eq!(settings.request, RequestDefaults::default());
        assert!(settings.recent_paths.is_empty());
    }
}
