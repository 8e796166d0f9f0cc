//! # 启动流程演示
//!
//! 演示容器的完整装配流程：注册组件、声明依赖、接口索引、适配外来
//! 类型、按依赖顺序初始化与销毁。
//!
//! 运行：`RUST_LOG=debug cargo run -p bootstrap-demo`

use std::sync::Arc;

use bean_registry::{BeanAdapter, Container};
use parking_lot::Mutex;
use registry_common::{Bean, BoxError, ThreadSafe};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 数据库连接
struct Database {
    dsn: String,
    connected: Mutex<bool>,
}

impl Bean for Database {
    fn init(&self) -> Result<(), BoxError> {
        info!("连接数据库: {}", self.dsn);
        *self.connected.lock() = true;
        Ok(())
    }

    fn destroy(&self) -> Result<(), BoxError> {
        info!("断开数据库: {}", self.dsn);
        *self.connected.lock() = false;
        Ok(())
    }
}

/// 缓存层
struct Cache;

impl Bean for Cache {
    fn init(&self) -> Result<(), BoxError> {
        info!("预热缓存");
        Ok(())
    }
}

/// 对外服务，依赖数据库与缓存
struct ApiServer;

impl Bean for ApiServer {
    fn init(&self) -> Result<(), BoxError> {
        info!("启动 API 服务");
        Ok(())
    }

    fn destroy(&self) -> Result<(), BoxError> {
        info!("停止 API 服务");
        Ok(())
    }
}

/// 健康检查能力，由多个组件实现
trait HealthCheck: Send + Sync {
    /// 组件是否健康
    fn healthy(&self) -> bool;
}

impl HealthCheck for Database {
    fn healthy(&self) -> bool {
        *self.connected.lock()
    }
}

impl HealthCheck for ApiServer {
    fn healthy(&self) -> bool {
        true
    }
}

/// 模拟不受我们控制的第三方指标客户端
struct MetricsClient;

impl MetricsClient {
    fn flush(&self) {
        info!("上报剩余指标");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let container = Container::thread_safe("demo");
    container.build(|c| {
        let db = Arc::new(Database {
            dsn: "postgres://localhost/demo".to_string(),
            connected: Mutex::new(false),
        });
        let db_info = c.register_bean(Arc::clone(&db), "db", &[])?;
        c.add_aliases(&db_info, &["database"])?;
        c.expose::<dyn HealthCheck>(&db_info, db)?;

        c.register_bean(Arc::new(Cache), "cache", &["db"])?;

        let api = Arc::new(ApiServer);
        let api_info = c.register_bean(Arc::clone(&api), "api", &["db", "cache"])?;
        c.expose::<dyn HealthCheck>(&api_info, api)?;

        // 外来类型通过适配器接入生命周期
        BeanAdapter::new(Arc::new(MetricsClient))
            .with_name("metrics")
            .on_destroy(|m: &MetricsClient| {
                m.flush();
                Ok(())
            })
            .register::<ThreadSafe>(&[])?;
        Ok(())
    })?;

    // 装配完成后统一初始化
    container.refresh()?;

    bean_registry::set_global_container(Arc::clone(&container));

    // 别名与主名称命中同一个组件
    let db: Arc<Database> = container.load_bean("database")?;
    info!("数据库已连接: {}", *db.connected.lock());

    let healthy = container
        .list_beans_by_interface::<dyn HealthCheck>()
        .iter()
        .all(|c| c.healthy());
    info!("健康检查通过: {healthy}");

    let api = container.load_bean_info("api")?;
    info!("api 依赖: {:?}", api.depends_on_names());

    container.destroy();
    Ok(())
}
