//! 客户端设置
//!
//! 提供设置数据结构和持久化

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chess_protocol::TransportType;
use serde::{Deserialize, Serialize};

use crate::animation::Cadence;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// EnvFilter 指令
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "chess_view=error",
            LogLevel::Warn => "chess_view=warn",
            LogLevel::Info => "chess_view=info",
            LogLevel::Debug => "chess_view=debug",
            LogLevel::Trace => "chess_view=trace",
        }
    }
}

/// 客户端设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    // === 网络设置 ===
    /// 服务器地址（WebSocket 为完整 URL，TCP 为 host:port）
    pub server_address: String,
    pub transport: TransportType,

    // === 动画与音效 ===
    pub cadence: Cadence,
    /// 音效音量（0-100）
    pub sfx_volume: u32,

    // === 高级设置 ===
    pub log_level: LogLevel,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_address: "ws://127.0.0.1:8000/ws".to_string(),
            transport: TransportType::default(),
            cadence: Cadence::default(),
            sfx_volume: 100,
            log_level: LogLevel::default(),
        }
    }
}

impl ClientSettings {
    /// 获取设置文件路径
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("chess-view");
            path.push("settings.json");
            path
        })
    }

    /// 从默认位置加载，任何失败都回退到默认设置
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            tracing::warn!("No config directory available, using default settings");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("Settings file not found, using default settings");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => {
                tracing::info!("Loaded settings: {:?}", path);
                settings
            }
            Err(e) => {
                tracing::warn!("{:#}, using default settings", e);
                Self::default()
            }
        }
    }

    /// 从指定文件加载并校验动画节奏
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings
            .cadence
            .validate()
            .context("Invalid animation cadence")?;
        Ok(settings)
    }

    /// 保存到默认位置
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path().context("No config directory available")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("Settings saved: {:?}", path);
        Ok(())
    }
}
