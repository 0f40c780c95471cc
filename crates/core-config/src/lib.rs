//! Configuration loading and parsing.
//!
//! Parses `glyph.toml` (or an override path provided by the binary)
//! extracting `[scroll.margin] vertical = <u16>` with default 0 when
//! absent. We clamp the effective value at `(h - 2) / 2` where `h` is the
//! current viewport height provided by the caller at application time. The
//! clamp logic lives in `Config::apply_context`. The raw parsed value
//! (preâ€‘clamp) is retained so future dynamic viewport changes can re-clamp.
//!
//! Breadth-first: only vertical margin implemented; horizontal and other
//! scroll behaviors deferred. Unknown fields are ignored (TOML deserialization
//! tolerance) to allow forward evolution without immediate warnings.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

pub mod path_rules;
pub use path_rules::{EffectiveConfig, PathRule, PathRuleSet, RoleStyle, RuleOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigPlatformTraits {
    pub is_windows: bool,
    pub supports_scroll_region: bool,
}

impl ConfigPlatformTraits {
    pub const fn new(is_windows: bool, supports_scroll_region: bool) -> Self {
        Self {
            is_windows,
            supports_scroll_region,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    pub viewport_columns: u16,
    pub viewport_rows: u16,
    pub status_rows: u16,
    pub overlay_rows: u16,
    pub platform: ConfigPlatformTraits,
}

impl ConfigContext {
    pub fn new(
        viewport_columns: u16,
        viewport_rows: u16,
        status_rows: u16,
        overlay_rows: u16,
        platform: ConfigPlatformTraits,
    ) -> Self {
        Self {
            viewport_columns,
            viewport_rows,
            status_rows,
            overlay_rows,
            platform,
        }
    }

    pub fn text_rows(&self) -> u16 {
        let reserved = self.status_rows.saturating_add(self.overlay_rows);
        self.viewport_rows.saturating_sub(reserved)
    }

    pub fn from_viewport_height(viewport_rows: u16) -> Self {
        Self {
            viewport_columns: 0,
            viewport_rows,
            status_rows: 0,
            overlay_rows: 0,
            platform: ConfigPlatformTraits::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct MarginConfig {
    #[serde(default)]
    pub vertical: u16,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScrollConfig {
    #[serde(default)]
    pub margin: MarginConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub input: InputConfig,
    /// `[[rule]]` tables: per-path-glob syntax/tab/style overrides (spec §6
    /// "Configuration"). Later entries override earlier ones on conflict.
    #[serde(default)]
    pub rule: Vec<PathRule>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,            // original file string (optional)
    pub file: ConfigFile,               // parsed (or default) data
    pub effective_vertical_margin: u16, // clamped to viewport semantics
    rule_set: PathRuleSet,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "InputConfig::default_timeout")] // Vim default: enabled
    pub timeout: bool,
    #[serde(default = "InputConfig::default_timeoutlen")] // Vim default usually 1000ms
    pub timeoutlen: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            timeout: Self::default_timeout(),
            timeoutlen: Self::default_timeoutlen(),
        }
    }
}

impl InputConfig {
    const fn default_timeout() -> bool {
        true
    }
    const fn default_timeoutlen() -> u32 {
        1000
    }
}
/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    // Prefer a local working-directory `glyph.toml` before falling back to
    // the platform config dir.
    let local = PathBuf::from("glyph.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("glyph").join("glyph.toml");
    }
    // Final fallback relative filename.
    PathBuf::from("glyph.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                let rule_set = PathRuleSet::compile(&file.rule).unwrap_or_else(|e| {
                    tracing::warn!(target: "config", error = %e, "invalid_rule_glob_ignored");
                    PathRuleSet::default()
                });
                Ok(Config {
                    raw: Some(content),
                    file,
                    effective_vertical_margin: 0, // computed later
                    rule_set,
                })
            }
            Err(_e) => {
                // On parse error fallback to defaults (breadth-first resilience).
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

impl Config {
    /// Merged per-path rule configuration for `path` (spec §6
    /// `ConfigForPath`): later `[[rule]]` entries whose glob matches
    /// override earlier ones, field by field.
    pub fn config_for_path(&self, path: &std::path::Path) -> EffectiveConfig {
        self.rule_set.config_for_path(path)
    }

    /// Apply viewport + platform context to compute clamped vertical margin.
    /// Returns the effective (possibly clamped) value.
    pub fn apply_context(&mut self, ctx: ConfigContext) -> u16 {
        let raw = self.file.scroll.margin.vertical;
        let text_rows = ctx.text_rows();
        let (clamped, max) = if text_rows <= 3 {
            (0, 0)
        } else {
            let max = (text_rows.saturating_sub(2)) / 2; // (h - 2)/2 using text rows
            (raw.min(max), max)
        };

        if clamped != raw {
            info!(
                target: "config",
                raw,
                clamped,
                max,
                text_rows,
                viewport_rows = ctx.viewport_rows,
                overlay_rows = ctx.overlay_rows,
                status_rows = ctx.status_rows,
                supports_scroll_region = ctx.platform.supports_scroll_region,
                is_windows = ctx.platform.is_windows,
                "scroll_margin_vertical_clamped"
            );
        }
        self.effective_vertical_margin = clamped;
        clamped
    }

    /// Back-compat wrapper for pre-context API: apply viewport height only.
    pub fn apply_viewport_height(&mut self, viewport_height: u16) -> u16 {
        self.apply_context(ConfigContext::from_viewport_height(viewport_height))
    }

    /// Recompute effective vertical margin on a viewport or platform change. Returns
    /// `Some(new_margin)` when the effective value changed, else `None`.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<u16> {
        let prev = self.effective_vertical_margin;
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }

    /// Back-compat wrapper using viewport height only.
    pub fn recompute_after_resize(&mut self, new_viewport_height: u16) -> Option<u16> {
        self.recompute_with_context(ConfigContext::from_viewport_height(new_viewport_height))
    }
}
