use super::platform::PlatformInfo;
use std::io;
use std::process::{Command, Output};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

/// 命令执行结果
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandResult {
    pub fn from_output(output: Output) -> Self {
        CommandResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        }
    }

    pub fn from_error(error: io::Error) -> Self {
        CommandResult {
            success: false,
            stdout: String::new(),
            stderr: error.to_string(),
            exit_code: None,
        }
    }

    /// 失败详情（优先 stderr，退回 stdout）
    pub fn failure_output(&self) -> String {
        if !self.stderr.is_empty() {
            self.stderr.clone()
        } else if !self.stdout.is_empty() {
            self.stdout.clone()
        } else {
            format!("命令失败，退出码: {:?}", self.exit_code)
        }
    }
}

/// 命令执行器
#[derive(Clone)]
pub struct CommandExecutor {
    platform: PlatformInfo,
}

impl CommandExecutor {
    pub fn new() -> Self {
        CommandExecutor {
            platform: PlatformInfo::current(),
        }
    }

    /// 执行命令（使用增强的 PATH）
    pub fn execute(&self, command_str: &str) -> CommandResult {
        let enhanced_path = self.platform.build_enhanced_path();

        let output = if self.platform.is_windows {
            #[cfg(target_os = "windows")]
            {
                Command::new("cmd")
                    .args(["/C", command_str])
                    .creation_flags(0x08000000) // CREATE_NO_WINDOW
                    .env("PATH", enhanced_path)
                    .output()
            }
            #[cfg(not(target_os = "windows"))]
            {
                Command::new("cmd")
                    .args(["/C", command_str])
                    .env("PATH", enhanced_path)
                    .output()
            }
        } else {
            Command::new("sh")
                .args(["-c", command_str])
                .env("PATH", enhanced_path)
                .output()
        };

        match output {
            Ok(output) => CommandResult::from_output(output),
            Err(e) => CommandResult::from_error(e),
        }
    }

    /// 执行命令（异步）
    pub async fn execute_async(&self, command_str: &str) -> CommandResult {
        let command_str = command_str.to_string();
        let platform = self.platform.clone();

        tokio::task::spawn_blocking(move || {
            let executor = CommandExecutor { platform };
            executor.execute(&command_str)
        })
        .await
        .unwrap_or_else(|e| CommandResult {
            success: false,
            stdout: String::new(),
            stderr: format!("任务执行失败: {e}"),
            exit_code: None,
        })
    }

    /// 执行多行安装脚本（Windows 用 PowerShell，其余用 bash）
    pub fn run_script(&self, script: &str) -> CommandResult {
        let enhanced_path = self.platform.build_enhanced_path();

        let output = if self.platform.is_windows {
            #[cfg(target_os = "windows")]
            {
                Command::new("powershell")
                    .args(["-NoProfile", "-NonInteractive", "-Command", script])
                    .creation_flags(0x08000000) // CREATE_NO_WINDOW
                    .env("PATH", enhanced_path)
                    .output()
            }
            #[cfg(not(target_os = "windows"))]
            {
                Command::new("powershell")
                    .args(["-NoProfile", "-NonInteractive", "-Command", script])
                    .env("PATH", enhanced_path)
                    .output()
            }
        } else {
            Command::new("bash")
                .args(["-c", script])
                .env("PATH", enhanced_path)
                .output()
        };

        match output {
            Ok(output) => CommandResult::from_output(output),
            Err(e) => CommandResult::from_error(e),
        }
    }

    /// 执行多行安装脚本（异步）
    pub async fn run_script_async(&self, script: &str) -> CommandResult {
        let script = script.to_string();
        let platform = self.platform.clone();

        tokio::task::spawn_blocking(move || {
            let executor = CommandExecutor { platform };
            executor.run_script(&script)
        })
        .await
        .unwrap_or_else(|e| CommandResult {
            success: false,
            stdout: String::new(),
            stderr: format!("任务执行失败: {e}"),
            exit_code: None,
        })
    }

    /// 检查命令是否存在
    pub fn command_exists(&self, command: &str) -> bool {
        // 从命令字符串中提取命令名（第一个词）
        // 例如: "node --version" -> "node"
        let cmd_name = command.split_whitespace().next().unwrap_or(command);

        let check_cmd = if self.platform.is_windows {
            format!("where {cmd_name}")
        } else {
            format!("which {cmd_name}")
        };

        self.execute(&check_cmd).success
    }

    /// 检查命令是否存在（异步）
    pub async fn command_exists_async(&self, command: &str) -> bool {
        let cmd_name = command.split_whitespace().next().unwrap_or(command);

        let check_cmd = if self.platform.is_windows {
            format!("where {cmd_name}")
        } else {
            format!("which {cmd_name}")
        };

        self.execute_async(&check_cmd).await.success
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}
