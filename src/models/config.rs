// 全局配置结构，放在 models 以便在库和二进制之间共享

use serde::{Deserialize, Serialize};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Console,
    File,
    Both,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default = "default_log_output")]
    pub output: LogOutput,
    /// 文件输出目录，None 时使用 ~/.openclaw-manager/logs
    #[serde(default)]
    pub file_path: Option<String>,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_log_output() -> LogOutput {
    LogOutput::Console
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            format: default_log_format(),
            output: default_log_output(),
            file_path: None,
        }
    }
}

/// 管理器全局配置 (~/.openclaw-manager/config.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// 本地网关端口
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,
    /// 服务状态轮询间隔（秒）
    #[serde(default = "default_monitor_poll_secs")]
    pub monitor_poll_secs: u64,
    /// 就绪完成后的展示延迟（毫秒），仅用于避免界面闪烁
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_gateway_port() -> u16 {
    18789
}

fn default_monitor_poll_secs() -> u64 {
    5
}

fn default_completion_delay_ms() -> u64 {
    800
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            gateway_port: default_gateway_port(),
            monitor_poll_secs: default_monitor_poll_secs(),
            completion_delay_ms: default_completion_delay_ms(),
            log: LogConfig::default(),
        }
    }
}
