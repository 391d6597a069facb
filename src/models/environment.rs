// 环境检查与安装相关模型
//
// EnvironmentStatus 是 check_environment 的不可变快照；
// InstallResult 只在单次调用内有意义，不做持久化。

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

/// Node.js 最低主版本要求
pub const NODE_MIN_MAJOR: u64 = 22;

/// 版本号提取正则，匹配 v1.2.3 或 1.2.3-beta.1
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"v?(\d+\.\d+\.\d+(?:-[\w.]+)?)").expect("版本正则解析失败"));

/// 操作系统类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    Macos,
    Linux,
    Other,
}

impl OperatingSystem {
    /// 当前运行平台
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OperatingSystem::Windows
        } else if cfg!(target_os = "macos") {
            OperatingSystem::Macos
        } else if cfg!(target_os = "linux") {
            OperatingSystem::Linux
        } else {
            OperatingSystem::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => "windows",
            OperatingSystem::Macos => "macos",
            OperatingSystem::Linux => "linux",
            OperatingSystem::Other => "other",
        }
    }
}

/// 环境依赖（安装目标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallTarget {
    /// Node.js 运行时（OpenClaw 的前置依赖）
    Node,
    /// OpenClaw CLI 本体
    Openclaw,
}

impl InstallTarget {
    /// 安装类型标识（终端脚本、日志中使用）
    pub fn id(&self) -> &'static str {
        match self {
            InstallTarget::Node => "nodejs",
            InstallTarget::Openclaw => "openclaw",
        }
    }

    /// 显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            InstallTarget::Node => "Node.js",
            InstallTarget::Openclaw => "OpenClaw",
        }
    }
}

/// 环境检查结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentStatus {
    /// Node.js 是否安装
    pub node_installed: bool,
    /// Node.js 版本
    pub node_version: Option<String>,
    /// Node.js 版本是否满足要求 (>=22)
    pub node_version_ok: bool,
    /// OpenClaw 是否安装
    pub openclaw_installed: bool,
    /// OpenClaw 版本
    pub openclaw_version: Option<String>,
    /// 配置目录是否存在
    pub config_dir_exists: bool,
    /// 是否全部就绪
    pub ready: bool,
    /// 操作系统
    pub os: OperatingSystem,
}

/// 安装结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallResult {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

impl InstallResult {
    pub fn ok(message: impl Into<String>) -> Self {
        InstallResult {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>, error: impl Into<String>) -> Self {
        InstallResult {
            success: false,
            message: message.into(),
            error: Some(error.into()),
        }
    }

    /// 失败是否属于「需要重启应用」的情况
    ///
    /// 重启标记目前是协作方消息里的约定文本（Windows 下 PATH 变更后
    /// 需要重启应用才能生效），集中在这一处判断，协作方引入结构化
    /// 错误码后只需替换此方法。
    pub fn restart_required(&self) -> bool {
        let mut haystack = self.message.to_lowercase();
        if let Some(err) = &self.error {
            haystack.push('\n');
            haystack.push_str(&err.to_lowercase());
        }
        haystack.contains("重启") || haystack.contains("restart")
    }

    /// 失败详情（优先 error，退回 message）
    pub fn failure_detail(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.message)
    }
}

/// 从命令输出中提取版本号
///
/// 例如 "v22.1.0" -> "22.1.0"，"openclaw 1.4.7 (build 3)" -> "1.4.7"
pub fn extract_version(output: &str) -> Option<String> {
    VERSION_RE
        .captures(output)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// 判断 Node.js 版本是否满足最低要求
///
/// 解析失败一律视为不达标
pub fn node_version_acceptable(version: Option<&str>) -> bool {
    let Some(raw) = version else {
        return false;
    };
    let Some(extracted) = extract_version(raw) else {
        return false;
    };
    match Version::parse(&extracted) {
        Ok(v) => v.major >= NODE_MIN_MAJOR,
        Err(_) => false,
    }
}
