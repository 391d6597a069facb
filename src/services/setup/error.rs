//! 就绪流程的请求拒绝类型
//!
//! 使用 `thiserror` 定义安装请求被编排器拒绝的原因；
//! 被拒绝的请求不会改变编排器状态，也不会触达系统服务

use crate::models::InstallTarget;
use thiserror::Error;

/// 安装请求被拒绝的原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallRequestError {
    /// 只有在安装步骤才接受安装请求
    #[error("当前不在安装步骤，无法执行安装")]
    NotInInstallStep,

    /// 同一时刻只允许一个安装动作
    #[error("已有安装任务进行中: {}", .0.display_name())]
    Busy(InstallTarget),

    /// OpenClaw 依赖达标的 Node.js，顺序不能颠倒
    #[error("Node.js 版本未满足要求，请先安装 Node.js")]
    NodeNotReady,
}
