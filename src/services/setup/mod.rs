// 环境就绪与服务监控
//
// orchestrator 驱动 检查 → 安装 → 完成 的就绪流程，
// monitor 独立轮询网关服务状态供界面展示，两者不共享可变状态

mod error;
mod guard;
mod monitor;
mod orchestrator;

pub use error::InstallRequestError;
pub use guard::InstallGuard;
pub use monitor::ServiceMonitor;
pub use orchestrator::{
    HostCapability, ReadinessOrchestrator, SetupEvent, SetupOptions, SetupStep,
};
