// 网关服务状态模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 网关服务运行状态
///
/// 每次查询都是完整快照，轮询方只做整体替换，不做字段合并
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// 服务是否在运行
    pub running: bool,
    /// 进程 ID（查不到时为 None）
    pub pid: Option<u32>,
    /// 监听端口
    pub port: u16,
}

/// 带观测时间的服务状态采样，用于界面展示「最后一次看到」
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSample {
    pub status: ServiceStatus,
    pub observed_at: DateTime<Utc>,
}

impl ServiceSample {
    pub fn now(status: ServiceStatus) -> Self {
        ServiceSample {
            status,
            observed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_status_roundtrip() {
        let status = ServiceStatus {
            running: true,
            pid: Some(4321),
            port: 18789,
        };
        let json = serde_json::to_string(&status).unwrap();
        let back: ServiceStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}
