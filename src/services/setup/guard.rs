// 单飞安装守卫
//
// 同一时刻至多允许一个安装动作持有令牌；这是用户流程的安全约束，
// 不是排队机制：持有期间的其他请求直接拒绝

use crate::models::InstallTarget;

/// 安装互斥令牌
#[derive(Debug, Default)]
pub struct InstallGuard {
    active: Option<InstallTarget>,
}

impl InstallGuard {
    pub fn new() -> Self {
        InstallGuard { active: None }
    }

    /// 尝试获取令牌，失败时返回当前持有者
    pub fn try_acquire(&mut self, target: InstallTarget) -> Result<(), InstallTarget> {
        match self.active {
            Some(holder) => Err(holder),
            None => {
                self.active = Some(target);
                Ok(())
            }
        }
    }

    /// 释放令牌，重复释放无副作用
    pub fn release(&mut self) {
        self.active = None;
    }

    /// 当前持有令牌的安装目标
    pub fn active(&self) -> Option<InstallTarget> {
        self.active
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }
}
