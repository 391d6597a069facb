// 环境就绪编排器
//
// 驱动 检查 → 安装 → 完成 的就绪流程。所有系统服务调用的失败都只
// 落到 last_error 供界面展示，状态机本身永远停留在可重入的步骤上；
// 除了安装失败后的一次手动终端回退，不做任何自动重试，重试由用户
// 通过「重新检查」触发。

use super::error::InstallRequestError;
use super::guard::InstallGuard;
use crate::models::{EnvironmentStatus, InstallTarget};
use crate::services::system::SystemServices;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// 就绪流程所处步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStep {
    /// 正在（或等待重新）检查环境
    Checking,
    /// 环境未就绪，等待用户触发安装
    Installing,
    /// 本轮就绪流程已完成
    Complete,
}

/// 宿主能力
///
/// 宿主在构造时声明自己能否访问系统服务；脱离受管宿主运行时
/// （例如纯浏览器开发模式）就绪检查直接视为通过
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCapability {
    /// 完整检查与安装能力
    Full,
    /// 没有系统服务，就绪性直接视为成立
    AssumeReady,
}

/// 编排器对外事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupEvent {
    /// 本轮就绪流程完成，每轮只发一次
    ReadinessComplete,
}

/// 编排器行为参数
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub capability: HostCapability,
    /// 完成后的展示延迟，避免检查页一闪而过；与正确性无关
    pub completion_delay: Duration,
}

impl Default for SetupOptions {
    fn default() -> Self {
        SetupOptions {
            capability: HostCapability::Full,
            completion_delay: Duration::from_millis(800),
        }
    }
}

/// 编排器状态快照（只读，供界面展示）
#[derive(Debug, Clone, Serialize)]
pub struct SetupSnapshot {
    pub step: SetupStep,
    pub environment: Option<EnvironmentStatus>,
    pub last_error: Option<String>,
    pub installing: Option<InstallTarget>,
}

/// 单次安装流转的内部结果
enum InstallOutcome {
    /// 安装完成，应自动重新检查
    Installed,
    /// 流程停住，错误文本交给界面
    Halted(String),
}

/// 环境就绪编排器
pub struct ReadinessOrchestrator {
    services: Arc<dyn SystemServices>,
    options: SetupOptions,
    step: SetupStep,
    environment: Option<EnvironmentStatus>,
    last_error: Option<String>,
    guard: InstallGuard,
    completed_once: bool,
    events: mpsc::UnboundedSender<SetupEvent>,
}

impl ReadinessOrchestrator {
    /// 创建编排器，返回编排器与事件接收端
    pub fn new(
        services: Arc<dyn SystemServices>,
        options: SetupOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SetupEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let orchestrator = ReadinessOrchestrator {
            services,
            options,
            step: SetupStep::Checking,
            environment: None,
            last_error: None,
            guard: InstallGuard::new(),
            completed_once: false,
            events,
        };
        (orchestrator, receiver)
    }

    pub fn step(&self) -> SetupStep {
        self.step
    }

    pub fn environment(&self) -> Option<&EnvironmentStatus> {
        self.environment.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// 当前进行中的安装目标
    pub fn installing_target(&self) -> Option<InstallTarget> {
        self.guard.active()
    }

    /// 是否至少完成过一轮就绪流程（宿主以此决定能否进入工作区）
    pub fn has_completed(&self) -> bool {
        self.completed_once
    }

    /// 只读状态快照
    pub fn snapshot(&self) -> SetupSnapshot {
        SetupSnapshot {
            step: self.step,
            environment: self.environment.clone(),
            last_error: self.last_error.clone(),
            installing: self.guard.active(),
        }
    }

    /// 启动或重新执行一轮就绪检查
    ///
    /// 查询失败可恢复：错误落到 last_error 并停留在检查步骤，
    /// 等待用户再次触发
    pub async fn recheck(&mut self) {
        self.last_error = None;
        self.step = SetupStep::Checking;

        if self.options.capability == HostCapability::AssumeReady {
            tracing::debug!("宿主无系统服务，就绪性直接视为成立");
            self.complete().await;
            return;
        }

        match self.services.check_environment().await {
            Ok(status) => {
                tracing::info!(ready = status.ready, "环境检查完成");
                let ready = status.ready;
                self.environment = Some(status);
                if ready {
                    self.complete().await;
                } else {
                    self.step = SetupStep::Installing;
                }
            }
            Err(e) => {
                tracing::warn!(error = ?e, "环境检查失败");
                self.last_error = Some(format!("环境检查失败: {e}"));
            }
        }
    }

    /// 请求安装一个依赖
    ///
    /// 拒绝的请求（步骤不对、已有安装进行中、依赖顺序不满足）原样
    /// 返回错误且不改变任何状态；接受的请求总是返回 Ok，安装本身
    /// 的失败通过 last_error 呈现
    pub async fn request_install(
        &mut self,
        target: InstallTarget,
    ) -> Result<(), InstallRequestError> {
        if self.step != SetupStep::Installing {
            return Err(InstallRequestError::NotInInstallStep);
        }

        // OpenClaw 必须等 Node.js 版本达标后才允许安装
        if target == InstallTarget::Openclaw && !self.node_version_ok() {
            return Err(InstallRequestError::NodeNotReady);
        }

        self.guard
            .try_acquire(target)
            .map_err(InstallRequestError::Busy)?;

        tracing::info!(target = target.id(), "开始安装流程");
        let outcome = self.run_install(target).await;

        // 所有退出路径统一释放令牌
        self.guard.release();

        match outcome {
            InstallOutcome::Installed => self.recheck().await,
            InstallOutcome::Halted(message) => {
                tracing::warn!(target = target.id(), message = %message, "安装流程停住");
                self.last_error = Some(message);
            }
        }
        Ok(())
    }

    fn node_version_ok(&self) -> bool {
        self.environment
            .as_ref()
            .map(|env| env.node_version_ok)
            .unwrap_or(false)
    }

    async fn complete(&mut self) {
        self.step = SetupStep::Complete;
        self.completed_once = true;

        if !self.options.completion_delay.is_zero() {
            tokio::time::sleep(self.options.completion_delay).await;
        }

        // 事件在 Checking → Complete 的迁移内发出，天然每轮一次
        let _ = self.events.send(SetupEvent::ReadinessComplete);
        tracing::info!("环境就绪流程完成");
    }

    async fn run_install(&mut self, target: InstallTarget) -> InstallOutcome {
        let result = match target {
            InstallTarget::Node => self.services.install_node().await,
            InstallTarget::Openclaw => self.services.install_openclaw().await,
        };

        match result {
            Ok(r) if r.success => {
                if target == InstallTarget::Openclaw {
                    // OpenClaw 装好后必须先完成本地配置初始化，再重新检查
                    self.bootstrap_openclaw_config().await
                } else {
                    InstallOutcome::Installed
                }
            }
            Ok(r) => {
                if r.restart_required() {
                    // 重启类失败不走手动终端回退，用户重启后重新检查即可
                    InstallOutcome::Halted(format!(
                        "{} 安装后需要重启应用，重启后请重新检查环境",
                        target.display_name()
                    ))
                } else {
                    self.fallback_to_terminal(target, r.failure_detail().to_string())
                        .await
                }
            }
            Err(e) => self.fallback_to_terminal(target, e.to_string()).await,
        }
    }

    async fn bootstrap_openclaw_config(&mut self) -> InstallOutcome {
        match self.services.init_openclaw_config().await {
            Ok(init) if init.success => InstallOutcome::Installed,
            Ok(init) => InstallOutcome::Halted(format!(
                "OpenClaw 配置初始化失败: {}",
                init.failure_detail()
            )),
            Err(e) => InstallOutcome::Halted(format!("OpenClaw 配置初始化失败: {e}")),
        }
    }

    /// 自动安装失败后的回退：打开手动安装终端
    async fn fallback_to_terminal(&mut self, target: InstallTarget, cause: String) -> InstallOutcome {
        tracing::warn!(
            target = target.id(),
            error = %cause,
            "自动安装失败，尝试打开手动安装终端"
        );

        match self.services.open_install_terminal(target).await {
            Ok(_) => InstallOutcome::Halted(format!(
                "{} 自动安装失败（{cause}），已打开手动安装终端，完成后请重新检查环境",
                target.display_name()
            )),
            Err(fallback_err) => InstallOutcome::Halted(format!(
                "{} 自动安装失败: {cause}；打开手动安装终端也失败: {fallback_err}",
                target.display_name()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InstallResult, OperatingSystem, ServiceStatus};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按脚本回应的系统服务模拟实现
    ///
    /// 每个队列按序弹出，只剩最后一个元素时重复使用它；
    /// call_log 记录调用顺序
    #[derive(Default)]
    struct MockSystemServices {
        env_results: Mutex<VecDeque<Result<EnvironmentStatus, String>>>,
        node_results: Mutex<VecDeque<Result<InstallResult, String>>>,
        openclaw_results: Mutex<VecDeque<Result<InstallResult, String>>>,
        init_results: Mutex<VecDeque<Result<InstallResult, String>>>,
        terminal_results: Mutex<VecDeque<Result<String, String>>>,
        call_log: Mutex<Vec<&'static str>>,
    }

    impl MockSystemServices {
        fn log(&self, name: &'static str) {
            self.call_log.lock().unwrap().push(name);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.call_log.lock().unwrap().clone()
        }

        fn count(&self, name: &str) -> usize {
            self.call_log
                .lock()
                .unwrap()
                .iter()
                .filter(|c| **c == name)
                .count()
        }

        fn next<T: Clone>(queue: &Mutex<VecDeque<Result<T, String>>>, what: &str) -> Result<T> {
            let mut q = queue.lock().unwrap();
            let item = if q.len() > 1 {
                q.pop_front()
            } else {
                q.front().cloned()
            };
            item.unwrap_or_else(|| panic!("测试未配置 {what} 的返回值"))
                .map_err(|e| anyhow::anyhow!(e))
        }
    }

    #[async_trait]
    impl SystemServices for MockSystemServices {
        async fn check_environment(&self) -> Result<EnvironmentStatus> {
            self.log("check_environment");
            Self::next(&self.env_results, "check_environment")
        }

        async fn install_node(&self) -> Result<InstallResult> {
            self.log("install_node");
            Self::next(&self.node_results, "install_node")
        }

        async fn install_openclaw(&self) -> Result<InstallResult> {
            self.log("install_openclaw");
            Self::next(&self.openclaw_results, "install_openclaw")
        }

        async fn init_openclaw_config(&self) -> Result<InstallResult> {
            self.log("init_openclaw_config");
            Self::next(&self.init_results, "init_openclaw_config")
        }

        async fn open_install_terminal(&self, _target: InstallTarget) -> Result<String> {
            self.log("open_install_terminal");
            Self::next(&self.terminal_results, "open_install_terminal")
        }

        async fn get_service_status(&self) -> Result<ServiceStatus> {
            self.log("get_service_status");
            anyhow::bail!("编排器测试不使用服务状态查询")
        }
    }

    fn env(ready: bool, node_version_ok: bool) -> EnvironmentStatus {
        EnvironmentStatus {
            node_installed: node_version_ok,
            node_version: node_version_ok.then(|| "22.1.0".to_string()),
            node_version_ok,
            openclaw_installed: ready,
            openclaw_version: ready.then(|| "1.4.7".to_string()),
            config_dir_exists: ready,
            ready,
            os: OperatingSystem::Linux,
        }
    }

    fn orchestrator(
        mock: Arc<MockSystemServices>,
    ) -> (ReadinessOrchestrator, mpsc::UnboundedReceiver<SetupEvent>) {
        ReadinessOrchestrator::new(
            mock,
            SetupOptions {
                capability: HostCapability::Full,
                completion_delay: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_ready_environment_completes_and_emits_once() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(true, true)));

        let (mut orch, mut events) = orchestrator(mock.clone());
        orch.recheck().await;

        assert_eq!(orch.step(), SetupStep::Complete);
        assert!(orch.has_completed());
        assert_eq!(events.try_recv(), Ok(SetupEvent::ReadinessComplete));
        assert!(events.try_recv().is_err());
        assert_eq!(mock.count("check_environment"), 1);
    }

    #[tokio::test]
    async fn test_not_ready_enters_installing_with_idle_guard() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(false, false)));

        let (mut orch, mut events) = orchestrator(mock);
        orch.recheck().await;

        assert_eq!(orch.step(), SetupStep::Installing);
        assert_eq!(orch.installing_target(), None);
        assert_eq!(orch.last_error(), None);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_assume_ready_skips_collaborator() {
        let mock = Arc::new(MockSystemServices::default());
        let (mut orch, mut events) = ReadinessOrchestrator::new(
            mock.clone(),
            SetupOptions {
                capability: HostCapability::AssumeReady,
                completion_delay: Duration::ZERO,
            },
        );

        orch.recheck().await;

        assert_eq!(orch.step(), SetupStep::Complete);
        assert_eq!(events.try_recv(), Ok(SetupEvent::ReadinessComplete));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_is_retryable() {
        let mock = Arc::new(MockSystemServices::default());
        {
            let mut q = mock.env_results.lock().unwrap();
            q.push_back(Err("系统服务不可达".to_string()));
            q.push_back(Ok(env(false, true)));
        }

        let (mut orch, _events) = orchestrator(mock);
        orch.recheck().await;

        assert_eq!(orch.step(), SetupStep::Checking);
        assert!(orch.last_error().unwrap().contains("环境检查失败"));

        // 第二次重试成功并清掉上一次的错误
        orch.recheck().await;
        assert_eq!(orch.step(), SetupStep::Installing);
        assert_eq!(orch.last_error(), None);
    }

    #[tokio::test]
    async fn test_repeated_recheck_converges() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(false, true)));

        let (mut orch, _events) = orchestrator(mock);
        for _ in 0..3 {
            orch.recheck().await;
            assert_eq!(orch.step(), SetupStep::Installing);
            assert_eq!(orch.last_error(), None);
            assert_eq!(orch.installing_target(), None);
        }
    }

    #[tokio::test]
    async fn test_node_install_success_triggers_recheck() {
        let mock = Arc::new(MockSystemServices::default());
        {
            let mut q = mock.env_results.lock().unwrap();
            q.push_back(Ok(env(false, false)));
            q.push_back(Ok(env(true, true)));
        }
        mock.node_results
            .lock()
            .unwrap()
            .push_back(Ok(InstallResult::ok("Node.js 安装成功！")));

        let (mut orch, mut events) = orchestrator(mock.clone());
        orch.recheck().await;
        assert_eq!(orch.step(), SetupStep::Installing);

        orch.request_install(InstallTarget::Node).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec!["check_environment", "install_node", "check_environment"]
        );
        assert_eq!(orch.step(), SetupStep::Complete);
        assert_eq!(orch.installing_target(), None);
        assert_eq!(events.try_recv(), Ok(SetupEvent::ReadinessComplete));
    }

    #[tokio::test]
    async fn test_openclaw_install_runs_config_bootstrap_before_recheck() {
        let mock = Arc::new(MockSystemServices::default());
        {
            let mut q = mock.env_results.lock().unwrap();
            q.push_back(Ok(env(false, true)));
            q.push_back(Ok(env(true, true)));
        }
        mock.openclaw_results
            .lock()
            .unwrap()
            .push_back(Ok(InstallResult::ok("OpenClaw 安装成功！")));
        mock.init_results
            .lock()
            .unwrap()
            .push_back(Ok(InstallResult::ok("配置初始化成功！")));

        let (mut orch, _events) = orchestrator(mock.clone());
        orch.recheck().await;
        orch.request_install(InstallTarget::Openclaw).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                "check_environment",
                "install_openclaw",
                "init_openclaw_config",
                "check_environment"
            ]
        );
        assert_eq!(orch.step(), SetupStep::Complete);
    }

    #[tokio::test]
    async fn test_failed_config_bootstrap_blocks_recheck() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(false, true)));
        mock.openclaw_results
            .lock()
            .unwrap()
            .push_back(Ok(InstallResult::ok("OpenClaw 安装成功！")));
        mock.init_results
            .lock()
            .unwrap()
            .push_back(Ok(InstallResult::fail("配置初始化失败", "权限不足")));

        let (mut orch, _events) = orchestrator(mock.clone());
        orch.recheck().await;
        orch.request_install(InstallTarget::Openclaw).await.unwrap();

        assert_eq!(mock.count("check_environment"), 1);
        assert_eq!(orch.step(), SetupStep::Installing);
        assert!(orch.last_error().unwrap().contains("配置初始化失败"));
        assert_eq!(orch.installing_target(), None);
    }

    #[tokio::test]
    async fn test_restart_required_skips_terminal_fallback() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(false, false)));
        mock.node_results
            .lock()
            .unwrap()
            .push_back(Ok(InstallResult::fail("安装后需要重启应用", "PATH 未刷新")));

        let (mut orch, _events) = orchestrator(mock.clone());
        orch.recheck().await;
        orch.request_install(InstallTarget::Node).await.unwrap();

        assert_eq!(mock.count("open_install_terminal"), 0);
        assert_eq!(orch.step(), SetupStep::Installing);
        assert!(orch.last_error().unwrap().contains("重启"));
        assert_eq!(orch.installing_target(), None);
    }

    #[tokio::test]
    async fn test_structured_failure_falls_back_to_terminal() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(false, false)));
        mock.node_results
            .lock()
            .unwrap()
            .push_back(Ok(InstallResult::fail("Node.js 安装失败", "网络不可用")));
        mock.terminal_results
            .lock()
            .unwrap()
            .push_back(Ok("已打开安装终端".to_string()));

        let (mut orch, _events) = orchestrator(mock.clone());
        orch.recheck().await;
        orch.request_install(InstallTarget::Node).await.unwrap();

        assert_eq!(mock.count("open_install_terminal"), 1);
        let error = orch.last_error().unwrap();
        assert!(error.contains("网络不可用"));
        assert!(error.contains("手动安装终端"));
        assert!(error.contains("重新检查"));
        assert_eq!(orch.installing_target(), None);
    }

    #[tokio::test]
    async fn test_thrown_failure_with_broken_fallback_combines_errors() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(false, false)));
        mock.node_results
            .lock()
            .unwrap()
            .push_back(Err("安装进程崩溃".to_string()));
        mock.terminal_results
            .lock()
            .unwrap()
            .push_back(Err("找不到终端程序".to_string()));

        let (mut orch, _events) = orchestrator(mock.clone());
        orch.recheck().await;
        orch.request_install(InstallTarget::Node).await.unwrap();

        let error = orch.last_error().unwrap();
        assert!(error.contains("安装进程崩溃"));
        assert!(error.contains("找不到终端程序"));
        assert_eq!(orch.step(), SetupStep::Installing);
        assert_eq!(orch.installing_target(), None);
    }

    #[tokio::test]
    async fn test_guard_released_after_every_outcome() {
        // 四类结果：成功、结构化失败、调用异常、需要重启
        let scripted: Vec<Result<InstallResult, String>> = vec![
            Ok(InstallResult::ok("Node.js 安装成功！")),
            Ok(InstallResult::fail("Node.js 安装失败", "磁盘已满")),
            Err("安装进程崩溃".to_string()),
            Ok(InstallResult::fail("安装后需要重启应用", "PATH 未刷新")),
        ];

        for outcome in scripted {
            let mock = Arc::new(MockSystemServices::default());
            mock.env_results
                .lock()
                .unwrap()
                .push_back(Ok(env(false, false)));
            mock.node_results.lock().unwrap().push_back(outcome);
            mock.terminal_results
                .lock()
                .unwrap()
                .push_back(Ok("已打开安装终端".to_string()));

            let (mut orch, _events) = orchestrator(mock);
            orch.recheck().await;
            orch.request_install(InstallTarget::Node).await.unwrap();

            assert_eq!(orch.installing_target(), None);
        }
    }

    #[tokio::test]
    async fn test_openclaw_requires_acceptable_node() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(false, false)));

        let (mut orch, _events) = orchestrator(mock.clone());
        orch.recheck().await;

        let result = orch.request_install(InstallTarget::Openclaw).await;

        assert_eq!(result, Err(InstallRequestError::NodeNotReady));
        assert_eq!(mock.count("install_openclaw"), 0);
        assert_eq!(orch.step(), SetupStep::Installing);
        assert_eq!(orch.last_error(), None);
    }

    #[tokio::test]
    async fn test_install_rejected_outside_installing_step() {
        let mock = Arc::new(MockSystemServices::default());
        let (mut orch, _events) = orchestrator(mock.clone());

        // 尚未检查，仍在 Checking
        let result = orch.request_install(InstallTarget::Node).await;

        assert_eq!(result, Err(InstallRequestError::NotInInstallStep));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_busy_guard_rejects_second_install() {
        let mock = Arc::new(MockSystemServices::default());
        let (mut orch, _events) = orchestrator(mock.clone());

        // 直接构造「安装进行中」的状态
        orch.step = SetupStep::Installing;
        orch.environment = Some(env(false, true));
        orch.guard.try_acquire(InstallTarget::Node).unwrap();

        let result = orch.request_install(InstallTarget::Openclaw).await;

        assert_eq!(
            result,
            Err(InstallRequestError::Busy(InstallTarget::Node))
        );
        assert_eq!(mock.count("install_openclaw"), 0);
        assert_eq!(orch.installing_target(), Some(InstallTarget::Node));
    }

    #[tokio::test]
    async fn test_explicit_recheck_after_complete_starts_new_run() {
        let mock = Arc::new(MockSystemServices::default());
        mock.env_results
            .lock()
            .unwrap()
            .push_back(Ok(env(true, true)));

        let (mut orch, mut events) = orchestrator(mock);
        orch.recheck().await;
        assert_eq!(events.try_recv(), Ok(SetupEvent::ReadinessComplete));

        // 用户显式重新检查：新的一轮再次完成并再次发出事件
        orch.recheck().await;
        assert_eq!(orch.step(), SetupStep::Complete);
        assert_eq!(events.try_recv(), Ok(SetupEvent::ReadinessComplete));
        assert!(events.try_recv().is_err());
    }
}
