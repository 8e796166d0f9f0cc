//! 生命周期能力定义
//!
//! 组件可以选择实现 [`Bean`] trait 来参与容器的有序初始化与销毁；
//! 不实现该 trait 的组件同样可以注册和排序，只是生命周期回调为空操作。

use crate::errors::BoxError;

/// 生命周期能力 trait
///
/// 两个方法都有空实现，组件按需覆盖。容器在注册时捕获一次
/// `Arc<dyn Bean>` 句柄，之后不再做运行时类型判断。
pub trait Bean: Send + Sync + 'static {
    /// 组件初始化
    ///
    /// 由 `refresh()` 在所有依赖初始化完成之后调用。失败会中止整个
    /// 初始化流程。
    fn init(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// 组件销毁
    ///
    /// 由 `destroy()` 在所有依赖方销毁完成之后调用。失败只记录日志，
    /// 不影响其余组件的销毁。
    fn destroy(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// 从类型推导默认 Bean 名称
///
/// 取类型名的最后一段并把首字母小写，例如 `demo::DataSource` 得到
/// `dataSource`。泛型参数会被剥掉。
#[must_use]
pub fn bean_name_of<T: 'static>() -> String {
    parse_bean_name(std::any::type_name::<T>())
}

/// 把完整类型路径解析成默认 Bean 名称
#[must_use]
pub fn parse_bean_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let title = base.rsplit("::").next().unwrap_or(base);

    let mut chars = title.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
