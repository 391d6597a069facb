// 系统服务的本地实现
//
// 环境检查与安装动作全部通过 shell 命令完成；安装脚本按操作系统
// 分派（winget/fnm、Homebrew、NodeSource、npm），手动安装终端与
// 自动安装共用同一套安装手段

use super::SystemServices;
use crate::models::{
    extract_version, node_version_acceptable, EnvironmentStatus, InstallResult, InstallTarget,
    OperatingSystem, ServiceStatus,
};
use crate::utils::{openclaw_config_dir, CommandExecutor, PlatformInfo};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// 网关端口探测超时
const PORT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// OpenClaw 配置目录下需要初始化的子目录
const CONFIG_SUBDIRS: [&str; 3] = ["agents/main/sessions", "agents/main/agent", "credentials"];

/// 本地系统服务
pub struct NativeSystemServices {
    executor: CommandExecutor,
    platform: PlatformInfo,
    gateway_port: u16,
}

impl NativeSystemServices {
    pub fn new(gateway_port: u16) -> Self {
        NativeSystemServices {
            executor: CommandExecutor::new(),
            platform: PlatformInfo::current(),
            gateway_port,
        }
    }

    /// 执行版本检查命令并提取版本号
    async fn detect_version(&self, command: &str) -> Option<String> {
        let result = self.executor.execute_async(command).await;
        if result.success {
            extract_version(&result.stdout)
        } else {
            None
        }
    }

    /// 查找监听指定端口的进程 ID（尽力而为）
    async fn find_listener_pid(&self, port: u16) -> Option<u32> {
        let result = if self.platform.is_windows {
            let script = format!(
                "(Get-NetTCPConnection -LocalPort {port} -State Listen | Select-Object -First 1).OwningProcess"
            );
            self.executor.run_script_async(&script).await
        } else {
            self.executor
                .execute_async(&format!("lsof -ti tcp:{port} -sTCP:LISTEN"))
                .await
        };

        if !result.success {
            return None;
        }
        result.stdout.lines().next()?.trim().parse::<u32>().ok()
    }

    async fn install_node_windows(&self) -> InstallResult {
        // 优先 winget（Windows 10/11 自带），失败回退 fnm
        let script = r#"
$ErrorActionPreference = 'Stop'
$hasWinget = Get-Command winget -ErrorAction SilentlyContinue
if ($hasWinget) {
    winget install --id OpenJS.NodeJS.LTS --accept-source-agreements --accept-package-agreements
    if ($LASTEXITCODE -eq 0) { exit 0 }
}
irm https://fnm.vercel.app/install.ps1 | iex
$env:FNM_DIR = "$env:USERPROFILE\.fnm"
$env:Path = "$env:FNM_DIR;$env:Path"
fnm install 22
fnm default 22
node --version
"#;

        let result = self.executor.run_script_async(script).await;
        if !result.success {
            return InstallResult::fail("Node.js 安装失败", result.failure_output());
        }

        // Windows 下新装的 PATH 对当前进程不可见，安装成功也要求重启
        if self.detect_version("node --version").await.is_some() {
            InstallResult::ok("Node.js 安装成功！请重启应用以使环境变量生效。")
        } else {
            InstallResult::fail("安装后需要重启应用", result.stdout)
        }
    }

    async fn install_node_macos(&self) -> InstallResult {
        let script = r#"
if ! command -v brew &> /dev/null; then
    /bin/bash -c "$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)"
    if [[ -f /opt/homebrew/bin/brew ]]; then
        eval "$(/opt/homebrew/bin/brew shellenv)"
    elif [[ -f /usr/local/bin/brew ]]; then
        eval "$(/usr/local/bin/brew shellenv)"
    fi
fi
brew install node@22
brew link --overwrite node@22
node --version
"#;

        let result = self.executor.run_script_async(script).await;
        if result.success {
            InstallResult::ok(format!("Node.js 安装成功！{}", result.stdout))
        } else {
            InstallResult::fail("Node.js 安装失败", result.failure_output())
        }
    }

    async fn install_node_linux(&self) -> InstallResult {
        // 按包管理器分派，使用 NodeSource 仓库
        let script = r#"
if command -v apt-get &> /dev/null; then
    curl -fsSL https://deb.nodesource.com/setup_22.x | sudo -E bash -
    sudo apt-get install -y nodejs
elif command -v dnf &> /dev/null; then
    curl -fsSL https://rpm.nodesource.com/setup_22.x | sudo bash -
    sudo dnf install -y nodejs
elif command -v yum &> /dev/null; then
    curl -fsSL https://rpm.nodesource.com/setup_22.x | sudo bash -
    sudo yum install -y nodejs
elif command -v pacman &> /dev/null; then
    sudo pacman -S nodejs npm --noconfirm
else
    echo "无法检测到支持的包管理器" >&2
    exit 1
fi
node --version
"#;

        let result = self.executor.run_script_async(script).await;
        if result.success {
            InstallResult::ok(format!("Node.js 安装成功！{}", result.stdout))
        } else {
            InstallResult::fail("Node.js 安装失败", result.failure_output())
        }
    }

    async fn install_openclaw_windows(&self) -> InstallResult {
        let script = r#"
$ErrorActionPreference = 'Stop'
$nodeVersion = node --version 2>$null
if (-not $nodeVersion) {
    Write-Host "错误：请先安装 Node.js"
    exit 1
}
npm install -g openclaw@latest
"#;

        let result = self.executor.run_script_async(script).await;
        if !result.success {
            return InstallResult::fail("OpenClaw 安装失败", result.failure_output());
        }

        if self.detect_version("openclaw --version").await.is_some() {
            InstallResult::ok("OpenClaw 安装成功！")
        } else {
            InstallResult::fail("安装后需要重启应用", result.stdout)
        }
    }

    async fn install_openclaw_unix(&self) -> InstallResult {
        let script = r#"
if ! command -v node &> /dev/null; then
    echo "错误：请先安装 Node.js" >&2
    exit 1
fi
npm install -g openclaw@latest
openclaw --version
"#;

        let result = self.executor.run_script_async(script).await;
        if result.success {
            InstallResult::ok(format!("OpenClaw 安装成功！{}", result.stdout))
        } else {
            InstallResult::fail("OpenClaw 安装失败", result.failure_output())
        }
    }

    /// 手动安装脚本正文（终端里展示给用户执行的内容）
    fn manual_script_body(&self, target: InstallTarget) -> String {
        match target {
            InstallTarget::Node => r#"#!/bin/bash
clear
echo "========================================"
echo "    Node.js 安装向导"
echo "========================================"
if ! command -v brew &> /dev/null && [[ "$(uname)" == "Darwin" ]]; then
    /bin/bash -c "$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)"
fi
if [[ "$(uname)" == "Darwin" ]]; then
    brew install node@22
    brew link --overwrite node@22
else
    curl -fsSL https://deb.nodesource.com/setup_22.x | sudo -E bash -
    sudo apt-get install -y nodejs
fi
echo "安装完成！"
node --version
read -p "按回车键关闭此窗口..."
"#
            .to_string(),
            InstallTarget::Openclaw => {
                let mkdirs = CONFIG_SUBDIRS
                    .iter()
                    .map(|d| format!("mkdir -p ~/.openclaw/{d}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    r#"#!/bin/bash
clear
echo "========================================"
echo "    OpenClaw 安装向导"
echo "========================================"
npm install -g openclaw@latest
openclaw config set gateway.mode local 2>/dev/null || true
{mkdirs}
echo "安装完成！"
openclaw --version
read -p "按回车键关闭此窗口..."
"#
                )
            }
        }
    }

    async fn open_terminal_windows(&self, target: InstallTarget) -> Result<String> {
        let inner = match target {
            InstallTarget::Node => {
                r#"
Write-Host "Node.js 安装向导" -ForegroundColor Cyan
$hasWinget = Get-Command winget -ErrorAction SilentlyContinue
if ($hasWinget) {
    winget install --id OpenJS.NodeJS.LTS --accept-source-agreements --accept-package-agreements
} else {
    Write-Host "请从 https://nodejs.org/en/download 下载安装 Node.js" -ForegroundColor Yellow
    Start-Process "https://nodejs.org/en/download"
}
Write-Host "安装完成后请重启 OpenClaw Manager" -ForegroundColor Green
Read-Host "按回车键关闭此窗口"
"#
            }
            InstallTarget::Openclaw => {
                r#"
Write-Host "OpenClaw 安装向导" -ForegroundColor Cyan
npm install -g openclaw@latest
openclaw config set gateway.mode local
openclaw --version
Read-Host "按回车键关闭此窗口"
"#
            }
        };

        // 管理员权限的交互窗口必须用 Start-Process 另起进程
        let script = format!(
            "Start-Process powershell -ArgumentList '-NoExit', '-Command', '{}' -Verb RunAs",
            inner.replace('\'', "''")
        );
        let result = self.executor.run_script_async(&script).await;
        if !result.success {
            anyhow::bail!("启动终端失败: {}", result.failure_output());
        }
        Ok("已打开安装终端".to_string())
    }

    async fn open_terminal_macos(&self, target: InstallTarget) -> Result<String> {
        let script_path = std::env::temp_dir().join(format!("openclaw_install_{}.command", target.id()));
        std::fs::write(&script_path, self.manual_script_body(target)).context("创建脚本失败")?;

        std::process::Command::new("chmod")
            .arg("+x")
            .arg(&script_path)
            .output()
            .context("设置权限失败")?;

        std::process::Command::new("open")
            .arg(&script_path)
            .spawn()
            .context("启动终端失败")?;

        Ok("已打开安装终端".to_string())
    }

    async fn open_terminal_linux(&self, target: InstallTarget) -> Result<String> {
        let script_path = std::env::temp_dir().join(format!("openclaw_install_{}.sh", target.id()));
        std::fs::write(&script_path, self.manual_script_body(target)).context("创建脚本失败")?;

        std::process::Command::new("chmod")
            .arg("+x")
            .arg(&script_path)
            .output()
            .context("设置权限失败")?;

        // 逐个尝试常见终端模拟器
        let terminals = ["gnome-terminal", "xfce4-terminal", "konsole", "xterm"];
        for term in terminals {
            if std::process::Command::new(term)
                .arg("--")
                .arg(&script_path)
                .spawn()
                .is_ok()
            {
                return Ok("已打开安装终端".to_string());
            }
        }

        anyhow::bail!(
            "无法启动终端，请手动运行: npm install -g openclaw ({} 安装)",
            target.display_name()
        )
    }
}

#[async_trait]
impl SystemServices for NativeSystemServices {
    async fn check_environment(&self) -> Result<EnvironmentStatus> {
        let node_version = self.detect_version("node --version").await;
        let node_installed = node_version.is_some();
        let node_version_ok = node_version_acceptable(node_version.as_deref());

        let openclaw_version = self.detect_version("openclaw --version").await;
        let openclaw_installed = openclaw_version.is_some();

        let config_dir_exists = openclaw_config_dir()
            .map(|dir| dir.exists())
            .unwrap_or(false);

        let ready = node_installed && node_version_ok && openclaw_installed;

        tracing::debug!(
            node_installed,
            node_version_ok,
            openclaw_installed,
            config_dir_exists,
            ready,
            "环境检查完成"
        );

        Ok(EnvironmentStatus {
            node_installed,
            node_version,
            node_version_ok,
            openclaw_installed,
            openclaw_version,
            config_dir_exists,
            ready,
            os: self.platform.os,
        })
    }

    async fn install_node(&self) -> Result<InstallResult> {
        tracing::info!("开始安装 Node.js");
        let result = match self.platform.os {
            OperatingSystem::Windows => self.install_node_windows().await,
            OperatingSystem::Macos => self.install_node_macos().await,
            OperatingSystem::Linux => self.install_node_linux().await,
            OperatingSystem::Other => InstallResult::fail(
                "不支持的操作系统",
                format!("不支持的操作系统: {}", self.platform.os.as_str()),
            ),
        };
        tracing::info!(success = result.success, message = %result.message, "Node.js 安装结束");
        Ok(result)
    }

    async fn install_openclaw(&self) -> Result<InstallResult> {
        tracing::info!("开始安装 OpenClaw");
        let result = match self.platform.os {
            OperatingSystem::Windows => self.install_openclaw_windows().await,
            _ => self.install_openclaw_unix().await,
        };
        tracing::info!(success = result.success, message = %result.message, "OpenClaw 安装结束");
        Ok(result)
    }

    async fn init_openclaw_config(&self) -> Result<InstallResult> {
        let Some(config_dir) = openclaw_config_dir() else {
            return Ok(InstallResult::fail("创建配置目录失败", "无法获取用户主目录"));
        };

        for subdir in CONFIG_SUBDIRS {
            let path = config_dir.join(subdir);
            if let Err(e) = std::fs::create_dir_all(&path) {
                return Ok(InstallResult::fail(
                    format!("创建目录失败: {subdir}"),
                    e.to_string(),
                ));
            }
        }

        // 网关默认使用本地模式
        let command = if self.platform.is_windows {
            "openclaw config set gateway.mode local 2>$null"
        } else {
            "openclaw config set gateway.mode local 2>/dev/null"
        };
        let result = self.executor.run_script_async(command).await;

        if result.success {
            Ok(InstallResult::ok("配置初始化成功！"))
        } else {
            Ok(InstallResult::fail(
                "配置初始化失败",
                result.failure_output(),
            ))
        }
    }

    async fn open_install_terminal(&self, target: InstallTarget) -> Result<String> {
        tracing::info!(target = target.id(), "打开手动安装终端");
        match self.platform.os {
            OperatingSystem::Windows => self.open_terminal_windows(target).await,
            OperatingSystem::Macos => self.open_terminal_macos(target).await,
            OperatingSystem::Linux => self.open_terminal_linux(target).await,
            OperatingSystem::Other => anyhow::bail!(
                "请手动安装 {}: https://nodejs.org/",
                target.display_name()
            ),
        }
    }

    async fn get_service_status(&self) -> Result<ServiceStatus> {
        let port = self.gateway_port;
        let addr = format!("127.0.0.1:{port}");

        let running = matches!(
            tokio::time::timeout(PORT_PROBE_TIMEOUT, TcpStream::connect(&addr)).await,
            Ok(Ok(_))
        );

        let pid = if running {
            self.find_listener_pid(port).await
        } else {
            None
        };

        Ok(ServiceStatus { running, pid, port })
    }
}
