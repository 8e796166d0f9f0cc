//! 线程级环境容器
//!
//! `build` 期间把正在装配的容器登记为当前线程的环境容器，供深层构造
//! 代码在不显式传递容器引用时自行注册（见 [`crate::BeanAdapter`]）。
//! 环境容器是装配期的便利通道，不是首选途径：回调同时以参数拿到容器，
//! 能显式传递时应当显式传递。
//!
//! 登记是线程局部的，由 RAII 守卫在所有退出路径（包括 panic 展开）上
//! 清除，build 结束后本线程不残留任何环境状态。

use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

use registry_common::{BoxError, ContainerError, ContainerResult, LockPolicy};
use tracing::{info, warn};

use crate::container::Container;

thread_local! {
    /// 当前线程的环境容器，类型擦除以容纳任一并发策略
    static CURRENT: RefCell<Option<Box<dyn Any>>> = const { RefCell::new(None) };
}

/// 环境容器登记守卫，离开作用域时清除登记
struct CurrentGuard;

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        CURRENT.with(|slot| slot.borrow_mut().take());
    }
}

impl<P: LockPolicy> Container<P> {
    /// 当前线程的环境容器，build 之外为 `None`
    ///
    /// 只命中并发策略与 `P` 一致的容器；策略不一致时记录警告并返回
    /// `None`。
    #[must_use]
    pub fn current() -> Option<Arc<Self>> {
        CURRENT.with(|slot| {
            let slot = slot.borrow();
            let erased = slot.as_ref()?;
            let found = erased.downcast_ref::<Arc<Self>>();
            if found.is_none() {
                warn!("当前线程已登记环境容器，但并发策略与请求的不一致");
            }
            found.cloned()
        })
    }

    /// 当前线程的环境容器，缺席时报错
    ///
    /// # Errors
    ///
    /// 当前线程没有正在 build 的容器时返回
    /// [`ContainerError::NoActiveContainer`]。
    pub fn load_current() -> ContainerResult<Arc<Self>> {
        Self::current().ok_or(ContainerError::NoActiveContainer)
    }

    /// 以本容器为当前线程的环境容器执行装配回调
    ///
    /// 回调执行期间容器同时作为参数传入并登记为环境容器；无论回调
    /// 成功、失败还是 panic，登记都会被清除。build 只做装配，不触发
    /// 初始化：何时 [`Container::refresh`] 由调用方决定，同一个容器
    /// 可以分多个阶段 build、最后统一初始化。
    ///
    /// # Errors
    ///
    /// 当前线程已有正在进行的 build 时返回
    /// [`ContainerError::ReentrantBuild`]；回调失败返回
    /// [`ContainerError::BuildFailed`]。
    pub fn build<F>(self: &Arc<Self>, callback: F) -> ContainerResult<()>
    where
        F: FnOnce(&Arc<Self>) -> Result<(), BoxError>,
    {
        let installed = CURRENT.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return false;
            }
            *slot = Some(Box::new(Arc::clone(self)));
            true
        });
        if !installed {
            return Err(ContainerError::ReentrantBuild {
                container: self.name().to_string(),
            });
        }
        let _guard = CurrentGuard;

        info!("容器 {} - 开始装配", self.name());
        callback(self).map_err(|source| ContainerError::BuildFailed {
            container: self.name().to_string(),
            source,
        })?;
        info!("容器 {} - 装配完成", self.name());
        Ok(())
    }

    /// 一步完成创建、装配与初始化的便利入口
    ///
    /// 等价于 [`Container::with_policy`] + [`Container::build`] +
    /// [`Container::refresh`]，适合单阶段启动的应用。
    ///
    /// # Errors
    ///
    /// 同 [`Container::build`] 与 [`Container::refresh`]。
    pub fn bootstrap<F>(name: impl Into<String>, callback: F) -> ContainerResult<Arc<Self>>
    where
        F: FnOnce(&Arc<Self>) -> Result<(), BoxError>,
    {
        let container = Self::with_policy(name);
        container.build(callback)?;
        container.refresh()?;
        Ok(container)
    }
}
