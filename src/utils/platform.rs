// 平台信息与目录约定

use crate::models::OperatingSystem;
use std::env;
use std::path::PathBuf;

/// 当前平台信息
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub os: OperatingSystem,
    pub is_windows: bool,
    pub is_macos: bool,
}

impl PlatformInfo {
    pub fn current() -> Self {
        let os = OperatingSystem::current();
        PlatformInfo {
            os,
            is_windows: os == OperatingSystem::Windows,
            is_macos: os == OperatingSystem::Macos,
        }
    }

    /// 构建增强 PATH
    ///
    /// GUI 进程继承的 PATH 经常缺少 shell 配置里追加的条目，
    /// 这里补上常见的用户级安装目录，保证 node/npm/openclaw 可被找到
    pub fn build_enhanced_path(&self) -> String {
        let base = env::var("PATH").unwrap_or_default();
        let mut extra: Vec<PathBuf> = Vec::new();

        if self.is_windows {
            if let Some(home) = dirs::home_dir() {
                extra.push(home.join(".fnm"));
                extra.push(home.join("AppData").join("Roaming").join("npm"));
            }
        } else {
            extra.push(PathBuf::from("/usr/local/bin"));
            if self.is_macos {
                extra.push(PathBuf::from("/opt/homebrew/bin"));
                extra.push(PathBuf::from("/opt/homebrew/opt/node@22/bin"));
            }
            if let Some(home) = dirs::home_dir() {
                extra.push(home.join(".local").join("bin"));
                extra.push(home.join(".npm-global").join("bin"));
            }
        }

        let separator = if self.is_windows { ';' } else { ':' };
        let mut enhanced = base;
        for path in extra {
            let path = path.to_string_lossy();
            if !enhanced.split(separator).any(|p| p == path) {
                if !enhanced.is_empty() {
                    enhanced.push(separator);
                }
                enhanced.push_str(&path);
            }
        }
        enhanced
    }
}

/// OpenClaw 配置目录 (~/.openclaw)
pub fn openclaw_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".openclaw"))
}
