use order_hub::{BackgroundTasks, HubState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志) 并加载配置
    let config = setup_environment();

    print_banner();
    tracing::info!(
        printer = %config.printer_addr,
        store = %config.store_name,
        "Order hub starting..."
    );

    // 2. 装配组件
    let state = HubState::initialize(&config)?;

    // 3. 启动同步器和后台任务
    let mut tasks = BackgroundTasks::new();
    state.start(&mut tasks).await?;
    tracing::info!(tasks = tasks.len(), "Order hub running, press Ctrl-C to stop");

    // 4. 等待退出信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    state.shutdown().await;
    tasks.shutdown().await;

    tracing::info!("Order hub stopped");
    Ok(())
}
