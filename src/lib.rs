// lib.rs - 暴露核心服务层给宿主（CLI / GUI）使用

pub mod core;
pub mod models;
pub mod services;
pub mod setup;
pub mod utils;

pub use models::*;
// Explicitly re-export only selected service types to avoid ambiguous glob re-exports
pub use services::setup::{
    HostCapability, InstallGuard, InstallRequestError, ReadinessOrchestrator, ServiceMonitor,
    SetupEvent, SetupOptions, SetupStep,
};
pub use services::system::{NativeSystemServices, SystemServices};
pub use setup::{initialize_app, AppContext};

// Re-export selected utils items
pub use utils::command::{CommandExecutor, CommandResult};
pub use utils::platform::PlatformInfo;

// 重新导出常用类型
pub use anyhow::{Context, Result};

// 导出日志初始化接口
pub use core::{init_logger, update_log_level};
