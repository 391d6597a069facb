// 网关服务状态监视器
//
// 独立于就绪流程的后台轮询：固定间隔查询服务状态，成功则整体替换
// 当前采样，失败静默丢弃（界面显示的是「最后一次看到」的状态，而
// 不是错误噪音）。与编排器不共享任何可变状态。

use crate::models::{ServiceSample, ServiceStatus};
use crate::services::system::SystemServices;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// 服务状态监视器
pub struct ServiceMonitor {
    sample_rx: watch::Receiver<Option<ServiceSample>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ServiceMonitor {
    /// 启动后台轮询任务
    pub fn start(services: Arc<dyn SystemServices>, poll_interval: Duration) -> Self {
        let (sample_tx, sample_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match services.get_service_status().await {
                            Ok(status) => {
                                let _ = sample_tx.send(Some(ServiceSample::now(status)));
                            }
                            Err(e) => {
                                // 查询失败不上抛，保留上一次采样
                                tracing::debug!(error = %e, "服务状态查询失败，保留上次采样");
                            }
                        }
                    }
                }
            }
            tracing::debug!("服务状态轮询已退出");
        });

        ServiceMonitor {
            sample_rx,
            cancel,
            handle: Some(handle),
        }
    }

    /// 最近一次成功采样（从未成功过则为 None）
    pub fn latest(&self) -> Option<ServiceSample> {
        self.sample_rx.borrow().clone()
    }

    /// 最近一次成功采样的服务状态
    pub fn latest_status(&self) -> Option<ServiceStatus> {
        self.latest().map(|sample| sample.status)
    }

    /// 订阅采样更新（只有成功的查询会触发通知）
    pub fn subscribe(&self) -> watch::Receiver<Option<ServiceSample>> {
        self.sample_rx.clone()
    }

    /// 停止轮询并等待后台任务退出，重复调用无副作用
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ServiceMonitor {
    fn drop(&mut self) {
        // 未显式 stop 时兜底，避免遗留定时任务
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
