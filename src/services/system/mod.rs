// System Services - 系统能力边界
//
// 就绪编排器与轮询器通过此 trait 访问操作系统层能力
// （环境检查、依赖安装、网关状态查询），调用方不关心具体实现

mod native;

pub use native::NativeSystemServices;

use crate::models::{EnvironmentStatus, InstallResult, InstallTarget, ServiceStatus};
use anyhow::Result;
use async_trait::async_trait;

/// 系统服务接口
///
/// 所有方法都是请求/响应式的一次性调用，失败均可恢复：
/// 调用方把错误落到展示层，不做自动重试
#[async_trait]
pub trait SystemServices: Send + Sync {
    /// 检查环境状态（Node.js、OpenClaw、配置目录）
    async fn check_environment(&self) -> Result<EnvironmentStatus>;

    /// 安装 Node.js
    async fn install_node(&self) -> Result<InstallResult>;

    /// 安装 OpenClaw CLI
    async fn install_openclaw(&self) -> Result<InstallResult>;

    /// 初始化 OpenClaw 本地配置（仅在 OpenClaw 安装成功后调用）
    async fn init_openclaw_config(&self) -> Result<InstallResult>;

    /// 打开终端执行手动安装（自动安装失败后的回退路径）
    async fn open_install_terminal(&self, target: InstallTarget) -> Result<String>;

    /// 查询网关服务状态，轻量操作，可高频轮询
    async fn get_service_status(&self) -> Result<ServiceStatus>;
}
