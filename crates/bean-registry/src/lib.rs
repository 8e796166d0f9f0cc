//! # Bean Registry
//!
//! 进程级组件注册与生命周期容器。
//!
//! ## 核心组件
//!
//! - [`Container`] - 容器：按名称、类型、接口、实例身份索引组件，
//!   驱动按依赖顺序的初始化与销毁
//! - [`BeanInfo`] - 组件描述符：名称集合、依赖边、初始化状态
//! - [`BeanAdapter`] - 外来组件适配器：显式 init/destroy 钩子
//!
//! ## 使用示例
//!
//! ```
//! use std::sync::Arc;
//! use bean_registry::Container;
//! use registry_common::Bean;
//!
//! struct Database;
//! impl Bean for Database {}
//!
//! struct ApiServer;
//! impl Bean for ApiServer {}
//!
//! # fn main() -> registry_common::ContainerResult<()> {
//! let container = Container::thread_safe("main");
//! container.register_bean(Arc::new(Database), "db", &[])?;
//! container.register_bean(Arc::new(ApiServer), "api", &["db"])?;
//! container.refresh()?;
//!
//! let db: Arc<Database> = container.load_bean("db")?;
//! container.destroy();
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod bean_info;
pub mod container;
mod current;

pub use adapter::BeanAdapter;
pub use bean_info::BeanInfo;
pub use container::Container;

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use registry_common::ThreadSafe;

/// 进程级默认容器，进程启动时设置一次
static GLOBAL_CONTAINER: Lazy<RwLock<Option<Arc<Container<ThreadSafe>>>>> =
    Lazy::new(|| RwLock::new(None));

/// 设置进程级默认容器，返回被替换的旧容器
pub fn set_global_container(
    container: Arc<Container<ThreadSafe>>,
) -> Option<Arc<Container<ThreadSafe>>> {
    GLOBAL_CONTAINER.write().replace(container)
}

/// 获取进程级默认容器
#[must_use]
pub fn global_container() -> Option<Arc<Container<ThreadSafe>>> {
    GLOBAL_CONTAINER.read().clone()
}
