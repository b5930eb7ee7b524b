//! 病房床位分配服务主程序

mod config;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use ward_core::WardRepository;
use ward_database::{DatabasePool, DatabaseQueries, MemoryRepository};
use ward_web::{AppState, WebServer};
use ward_workflow::WardWorkflow;

use crate::config::{load_config, AppConfig, ConfigValidator, StorageBackend};

/// 服务命令行参数
#[derive(Parser, Debug)]
#[command(name = "ward-server")]
#[command(about = "Ward placement service: waiting list, bed assignment, discharge and supply requisitions")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,

    /// 使用带演示数据的内存存储
    #[arg(long)]
    memory: bool,

    /// 启动前创建数据库表
    #[arg(long)]
    init_schema: bool,
}

impl Args {
    /// 命令行参数覆盖配置
    fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.memory {
            config.database.backend = StorageBackend::Memory;
        }
        if self.init_schema {
            config.database.init_schema = true;
        }
    }
}

async fn build_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn WardRepository>> {
    match config.database.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage with demo wards");
            Ok(Arc::new(MemoryRepository::demo()))
        }
        StorageBackend::Postgres => {
            let pool = DatabasePool::new(&config.database.pool_settings()).await?;
            let queries = DatabaseQueries::new(pool);
            if config.database.init_schema {
                queries.create_tables().await?;
            }
            Ok(Arc::new(queries))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut app_config = load_config(args.config.as_deref())?;
    args.apply(&mut app_config);

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(app_config.logging.level.as_str())
        .init();

    ConfigValidator::new().validate(&app_config)?;

    info!("启动病房服务...");
    info!("  服务名称: {}", app_config.server.name);
    info!("  监听地址: {}:{}", app_config.server.host, app_config.server.port);
    info!("  存储后端: {:?}", app_config.database.backend);

    let repository = build_repository(&app_config).await?;
    let workflow = WardWorkflow::new(repository);

    let addr: SocketAddr = format!("{}:{}", app_config.server.host, app_config.server.port)
        .parse()
        .context("Invalid listen address")?;

    WebServer::new(addr, AppState::new(workflow)).run().await?;

    Ok(())
}
