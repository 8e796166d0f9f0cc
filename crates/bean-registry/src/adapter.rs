//! 外来组件适配器
//!
//! 不方便直接实现 [`Bean`] 的第三方类型（连接池、客户端句柄等）通过
//! [`BeanAdapter`] 接入容器：适配器持有外来实例，挂接显式的 init /
//! destroy 钩子，自身作为组件注册并参与生命周期编排。

use std::sync::Arc;

use registry_common::{bean_name_of, Bean, BoxError, ContainerResult, LockPolicy};

use crate::bean_info::BeanInfo;
use crate::container::Container;

type Hook<T> = Box<dyn Fn(&T) -> Result<(), BoxError> + Send + Sync>;

/// 外来组件适配器
///
/// 默认组件名称由被包装类型名派生（类型名去掉路径、首字母小写），可用
/// [`BeanAdapter::with_name`] 覆盖。
pub struct BeanAdapter<T: Send + Sync + 'static> {
    inner: Arc<T>,
    name: String,
    on_init: Option<Hook<T>>,
    on_destroy: Option<Hook<T>>,
}

impl<T: Send + Sync + 'static> BeanAdapter<T> {
    /// 包装一个外来实例，名称取被包装类型的派生名
    pub fn new(inner: Arc<T>) -> Self {
        Self {
            inner,
            name: bean_name_of::<T>(),
            on_init: None,
            on_destroy: None,
        }
    }

    /// 覆盖组件名称
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 挂接初始化钩子，refresh 时对被包装实例调用
    #[must_use]
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_init = Some(Box::new(hook));
        self
    }

    /// 挂接销毁钩子，destroy 时对被包装实例调用
    #[must_use]
    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_destroy = Some(Box::new(hook));
        self
    }

    /// 组件名称
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 被包装的实例
    #[must_use]
    pub fn inner(&self) -> &Arc<T> {
        &self.inner
    }

    /// 注册到指定容器
    ///
    /// # Errors
    ///
    /// 同 [`Container::register_bean`]。
    pub fn register_with<P: LockPolicy>(
        self,
        container: &Container<P>,
        depends_on: &[&str],
    ) -> ContainerResult<Arc<BeanInfo<P>>> {
        let name = self.name.clone();
        container.register_bean(Arc::new(self), &name, depends_on)
    }

    /// 注册到当前线程的环境容器，供 build 回调深处的构造代码使用
    ///
    /// # Errors
    ///
    /// 当前线程没有环境容器时返回
    /// [`registry_common::ContainerError::NoActiveContainer`]，其余同
    /// [`Container::register_bean`]。
    pub fn register<P: LockPolicy>(self, depends_on: &[&str]) -> ContainerResult<Arc<BeanInfo<P>>> {
        let container = Container::<P>::load_current()?;
        self.register_with(&container, depends_on)
    }
}

impl<T: Send + Sync + 'static> Bean for BeanAdapter<T> {
    fn init(&self) -> Result<(), BoxError> {
        match &self.on_init {
            Some(hook) => hook(&self.inner),
            None => Ok(()),
        }
    }

    fn destroy(&self) -> Result<(), BoxError> {
        match &self.on_destroy {
            Some(hook) => hook(&self.inner),
            None => Ok(()),
        }
    }
}
