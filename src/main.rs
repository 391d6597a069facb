// 无界面宿主：执行一次环境就绪检查并打印诊断结果
//
// GUI 宿主走同一套 initialize_app 流程；这里只做检查与展示，
// 安装动作必须由用户在界面上触发

use openclaw_manager::{initialize_app, HostCapability, SetupStep};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let mut ctx = initialize_app(HostCapability::Full).await;

    println!("OpenClaw Manager 环境诊断");
    println!("========================================");

    if let Some(env) = ctx.orchestrator.environment() {
        let node = match (&env.node_version, env.node_version_ok) {
            (Some(v), true) => format!("v{v}"),
            (Some(v), false) => format!("v{v}（版本过低，需要 >= 22）"),
            (None, _) => "未安装".to_string(),
        };
        let openclaw = env
            .openclaw_version
            .as_deref()
            .map(|v| format!("v{v}"))
            .unwrap_or_else(|| "未安装".to_string());

        println!("  操作系统:   {}", env.os.as_str());
        println!("  Node.js:    {node}");
        println!("  OpenClaw:   {openclaw}");
        println!(
            "  配置目录:   {}",
            if env.config_dir_exists { "已存在" } else { "不存在" }
        );
    }

    match ctx.orchestrator.step() {
        SetupStep::Complete => println!("✅ 环境已就绪"),
        SetupStep::Installing => println!("⚠️  环境未就绪，请在管理界面安装缺失的依赖"),
        SetupStep::Checking => println!("❌ 环境检查未完成"),
    }

    if let Some(error) = ctx.orchestrator.last_error() {
        println!("   {error}");
    }

    // 等待监视器的第一次采样；查不到就按未知处理
    let mut status_rx = ctx.monitor.subscribe();
    let sample = match tokio::time::timeout(Duration::from_secs(2), status_rx.changed()).await {
        Ok(Ok(())) => status_rx.borrow().clone(),
        _ => None,
    };

    match sample {
        Some(sample) if sample.status.running => {
            let pid = sample
                .status
                .pid
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!("🟢 网关运行中 (pid: {pid}, port: {})", sample.status.port);
        }
        Some(sample) => println!("⚪ 网关未运行 (port: {})", sample.status.port),
        None => println!("⚪ 网关状态未知"),
    }

    ctx.monitor.stop().await;
}
