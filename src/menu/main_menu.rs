use crate::component::{AudioBitrate, ImageEncoding, QualityPreset};
use crate::config::save::save_settings;
use crate::config::types::{Config, Language};
use crate::menu::handlers::{run_build_request, run_dry_run_estimate};
use anyhow::Result;
use console::{Term, style};
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_dry_run"),
        t!("main_menu.opt_build"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_dry_run_estimate(term, shutdown_signal, config)?;
            config.reload_settings();
            Ok(true)
        }
        Some(1) => {
            run_build_request(term, shutdown_signal, config)?;
            config.reload_settings();
            Ok(true)
        }
        Some(2) => {
            show_settings_menu(term, config)?;
            Ok(true)
        }
        Some(3) | None => Ok(false), // ESC 直接離開
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_model"),
            t!("settings.opt_preset"),
            t!("settings.opt_encoding"),
            t!("settings.opt_audio"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_model_menu(term, config)?,
            Some(1) => show_preset_menu(term, config)?,
            Some(2) => show_encoding_menu(term, config)?,
            Some(3) => show_audio_menu(term, config)?,
            Some(4) => show_language_menu(term, config)?,
            Some(5) | None => break,
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 顯示單選清單，回傳使用者選擇的索引（ESC 為 `None`）
fn select_setting(
    term: &Term,
    title: &str,
    current: &str,
    items: &[String],
    default_index: usize,
) -> Result<Option<usize>> {
    term.clear_screen()?;

    println!("{}", style(title).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());
    println!("\n{} {}", style(t!("settings.current")).dim(), current);
    println!();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.prompt"))
        .items(items)
        .default(default_index)
        .interact_on_opt(term)?;

    Ok(selection)
}

fn confirm_saved(config: &Config, value: &str) -> Result<()> {
    save_settings(&config.settings)?;
    println!("\n{} {}", style(t!("settings.saved")).green(), value);
    std::thread::sleep(std::time::Duration::from_secs(1));
    Ok(())
}

/// 預設模型選單
fn show_model_menu(term: &Term, config: &mut Config) -> Result<()> {
    let models: Vec<String> = config
        .pricing
        .model_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let current = config.settings.request.model.clone();
    let default_index = models.iter().position(|m| *m == current).unwrap_or(0);

    let Some(selection) =
        select_setting(term, &t!("settings.model.title"), &current, &models, default_index)?
    else {
        return Ok(());
    };

    let selected = models[selection].clone();
    if selected != current {
        config.settings.request.model = selected.clone();
        confirm_saved(config, &selected)?;
    }

    Ok(())
}

/// 預設解析度選單
fn show_preset_menu(term: &Term, config: &mut Config) -> Result<()> {
    let items: Vec<String> = QualityPreset::ALL.iter().map(ToString::to_string).collect();
    let current = config.settings.request.preset;
    let default_index = QualityPreset::ALL
        .iter()
        .position(|p| *p == current)
        .unwrap_or(0);

    let Some(selection) = select_setting(
        term,
        &t!("settings.preset.title"),
        &current.to_string(),
        &items,
        default_index,
    )?
    else {
        return Ok(());
    };

    let selected = QualityPreset::ALL[selection];
    if selected != current {
        config.settings.request.preset = selected;
        confirm_saved(config, &selected.to_string())?;
    }

    Ok(())
}

/// 預設影格編碼選單
fn show_encoding_menu(term: &Term, config: &mut Config) -> Result<()> {
    let items: Vec<String> = ImageEncoding::ALL.iter().map(ToString::to_string).collect();
    let current = config.settings.request.encoding;
    let default_index = ImageEncoding::ALL
        .iter()
        .position(|e| *e == current)
        .unwrap_or(0);

    let Some(selection) = select_setting(
        term,
        &t!("settings.encoding.title"),
        current.name(),
        &items,
        default_index,
    )?
    else {
        return Ok(());
    };

    let selected = ImageEncoding::ALL[selection];
    if selected != current {
        config.settings.request.encoding = selected;
        confirm_saved(config, selected.name())?;
    }

    Ok(())
}

/// 預設音訊選單：停用或選擇位元率
fn show_audio_menu(term: &Term, config: &mut Config) -> Result<()> {
    let mut items = vec![t!("settings.audio.disabled").to_string()];
    items.extend(AudioBitrate::ALL.iter().map(ToString::to_string));

    let request = &config.settings.request;
    let current_index = if request.audio_enabled {
        AudioBitrate::ALL
            .iter()
            .position(|b| b.kbps() == request.audio_bitrate_kbps)
            .map_or(0, |i| i + 1)
    } else {
        0
    };
    let current = items[current_index].clone();

    let Some(selection) =
        select_setting(term, &t!("settings.audio.title"), &current, &items, current_index)?
    else {
        return Ok(());
    };

    if selection != current_index {
        let request = &mut config.settings.request;
        request.audio_enabled = selection > 0;
        if let Some(bitrate) = selection.checked_sub(1).map(|i| AudioBitrate::ALL[i]) {
            request.audio_bitrate_kbps = bitrate.kbps();
        }
        let selected = items[selection].clone();
        confirm_saved(config, &selected)?;
    }

    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    let languages = [Language::EnUs, Language::ZhTw];
    let items: Vec<String> = languages.iter().map(ToString::to_string).collect();
    let current = config.settings.language;
    let default_index = languages.iter().position(|&l| l == current).unwrap_or(0);

    let Some(selection) = select_setting(
        term,
        &t!("settings.language.title"),
        &current.to_string(),
        &items,
        default_index,
    )?
    else {
        return Ok(());
    };

    let selected = languages[selection];
    if selected != current {
        config.settings.language = selected;
        rust_i18n::set_locale(selected.as_str());
        confirm_saved(config, &selected.to_string())?;
    }

    Ok(())
}
