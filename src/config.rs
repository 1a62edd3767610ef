use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunked::MAX_COMPRESSION;
use crate::error::{Error, Result};

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "SHELL_SWEEP_CONFIG";
/// 未设置环境变量时在当前目录查找的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "shell-sweep.toml";

/// 全局配置，所有字段都有默认值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

/// 输入与输出文件位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// 原始数据根目录，下有 Run0/ Run1/ Run2/
    pub raw_dir: PathBuf,
    pub schedule: PathBuf,
    pub stats_file: PathBuf,
    pub points_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("RawData"),
            schedule: PathBuf::from("Schedule.csv"),
            stats_file: PathBuf::from("StatsFile.arr"),
            points_file: PathBuf::from("VTKFile.arr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 查看器会话过期时间（分钟）
    pub session_ttl_minutes: u64,
    /// 过期会话清理间隔（分钟）
    pub cleanup_interval_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            session_ttl_minutes: 30,
            cleanup_interval_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// gzip 压缩级别 0-9
    pub compression_level: u32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            compression_level: MAX_COMPRESSION,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        if config.aggregate.compression_level > MAX_COMPRESSION {
            return Err(Error::Config(format!(
                "compression_level 必须在 0-{} 之间，实际为 {}",
                MAX_COMPRESSION, config.aggregate.compression_level
            )));
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&text)
    }

    /// 按 `SHELL_SWEEP_CONFIG`、`shell-sweep.toml`、默认值的顺序加载
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            info!("加载配置文件 {}", path);
            return Self::from_path(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            info!("加载配置文件 {}", local.display());
            return Self::from_path(local);
        }
        info!("未找到配置文件，使用默认配置");
        Ok(Self::default())
    }
}
