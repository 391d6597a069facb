use crate::models::ManagerConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 管理器配置目录 (~/.openclaw-manager)，若不存在则创建
pub fn config_dir() -> Result<PathBuf, String> {
    let home_dir = dirs::home_dir().ok_or("Failed to get home directory")?;
    let config_dir = home_dir.join(".openclaw-manager");
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    Ok(config_dir)
}

/// 全局配置文件路径
pub fn manager_config_path() -> Result<PathBuf, String> {
    Ok(config_dir()?.join("config.json"))
}

/// 读取全局配置（若文件不存在返回 Ok(None)）
pub fn read_manager_config() -> Result<Option<ManagerConfig>, String> {
    let config_path = manager_config_path()?;
    read_manager_config_from(&config_path)
}

pub(crate) fn read_manager_config_from(path: &Path) -> Result<Option<ManagerConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
    let config: ManagerConfig =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(config))
}

/// 写入全局配置，同时设置文件权限
pub fn write_manager_config(config: &ManagerConfig) -> Result<(), String> {
    let config_path = manager_config_path()?;
    write_manager_config_to(&config_path, config)
}

pub(crate) fn write_manager_config_to(path: &Path, config: &ManagerConfig) -> Result<(), String> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, json).map_err(|e| format!("Failed to write config: {}", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata =
            fs::metadata(path).map_err(|e| format!("Failed to get file metadata: {}", e))?;
        let mut perms = metadata.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)
            .map_err(|e| format!("Failed to set file permissions: {}", e))?;
    }

    Ok(())
}
