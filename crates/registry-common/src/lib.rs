//! # Registry Common
//!
//! 这个 crate 提供 Bean 注册表的公共 traits 和工具。
//!
//! ## 核心组件
//!
//! - [`Bean`] - 生命周期能力 trait
//! - [`ContainerError`] - 容器错误类型
//! - [`StateCell`] / [`LockPolicy`] - 读写守卫抽象与并发配置策略
//!
//! ## 设计原则
//!
//! - 并发配置在构造期通过类型选定，误用在编译期失败
//! - 生命周期能力在注册时一次性捕获，调用路径上没有运行时类型判断
//! - 同步 API：所有临界区有界，不存在协作式挂起

pub mod bean;
pub mod errors;
pub mod sync;

pub use bean::*;
pub use errors::*;
pub use sync::*;
