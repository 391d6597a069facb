use crate::core::init_logger;
use crate::models::ManagerConfig;
use crate::services::setup::{
    HostCapability, ReadinessOrchestrator, ServiceMonitor, SetupEvent, SetupOptions,
};
use crate::services::system::{NativeSystemServices, SystemServices};
use crate::utils::config::read_manager_config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// 启动初始化上下文
///
/// 包含宿主运行所需的核心服务实例；宿主只有在编排器至少完成过
/// 一轮就绪流程后（`orchestrator.has_completed()`）才能进入工作区
pub struct AppContext {
    pub orchestrator: ReadinessOrchestrator,
    pub monitor: ServiceMonitor,
    pub events: mpsc::UnboundedReceiver<SetupEvent>,
    pub config: ManagerConfig,
}

/// 初始化日志系统
///
/// 从全局配置读取日志配置，失败则使用默认配置
fn init_logging(config: &ManagerConfig) {
    if let Err(e) = init_logger(&config.log) {
        // 日志系统初始化失败时使用 eprintln!（因为 tracing 还不可用）
        eprintln!("WARNING: Failed to initialize logging system: {}", e);
        // 继续运行，但日志功能将不可用
    }

    tracing::info!("OpenClaw Manager 启动");
}

/// 执行所有启动初始化任务
///
/// 按顺序执行：配置 → 日志 → 系统服务 → 首次就绪检查 → 状态监视器。
/// 首次就绪检查在这里执行且仅执行一次，之后的重新检查全部由用户触发。
pub async fn initialize_app(capability: HostCapability) -> AppContext {
    let config = read_manager_config().ok().flatten().unwrap_or_default();

    init_logging(&config);

    let services: Arc<dyn SystemServices> =
        Arc::new(NativeSystemServices::new(config.gateway_port));

    let options = SetupOptions {
        capability,
        completion_delay: Duration::from_millis(config.completion_delay_ms),
    };
    let (mut orchestrator, events) = ReadinessOrchestrator::new(Arc::clone(&services), options);

    orchestrator.recheck().await;

    let monitor = ServiceMonitor::start(services, Duration::from_secs(config.monitor_poll_secs));

    AppContext {
        orchestrator,
        monitor,
        events,
        config,
    }
}
