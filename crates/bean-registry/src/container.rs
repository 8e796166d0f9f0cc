//! Bean 容器
//!
//! 进程级组件注册表：按名称、具体类型、接口能力和实例身份四个维度索引
//! 描述符，记录依赖边，驱动按依赖顺序的初始化与销毁。索引的全部变更都
//! 经由唯一的内部注册例程，在同一个写临界区内完成。
//!
//! 容器锁只保护索引操作；生命周期回调在描述符自身的锁之下执行，初始化
//! 组件 X 不会阻塞无关组件 Y 的查找。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use registry_common::{
    Bean, ContainerError, ContainerResult, LockPolicy, SingleThread, StateCell, ThreadSafe,
};
use tracing::{debug, info};

use crate::bean_info::BeanInfo;

/// 接口索引条目：描述符加上注册时预先完成 unsize 转换的 trait 对象视图
struct InterfaceEntry<P: LockPolicy> {
    info: Arc<BeanInfo<P>>,
    /// 类型擦除存放的 `Arc<dyn Trait>`，列举时按 `Arc<I>` 取回
    view: Box<dyn Any + Send + Sync>,
}

/// 容器索引，整体置于策略状态单元之内
struct Indices<P: LockPolicy> {
    /// 名称（含别名）→ 描述符
    by_name: HashMap<String, Arc<BeanInfo<P>>>,
    /// 具体类型 → 描述符，同一类型最多注册一个实例
    by_type: HashMap<TypeId, Arc<BeanInfo<P>>>,
    /// 实例身份（数据指针地址）→ 描述符
    by_instance: HashMap<usize, Arc<BeanInfo<P>>>,
    /// 接口 `TypeId` → 实现者条目，按注册顺序排列
    by_interface: HashMap<TypeId, Vec<InterfaceEntry<P>>>,
    /// 注册顺序，refresh/destroy 的遍历基准
    order: Vec<Arc<BeanInfo<P>>>,
}

impl<P: LockPolicy> Default for Indices<P> {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
            by_type: HashMap::new(),
            by_instance: HashMap::new(),
            by_interface: HashMap::new(),
            order: Vec::new(),
        }
    }
}

/// Bean 容器
///
/// 并发配置由类型参数在构造期固定：[`Container::thread_safe`] 产出的
/// 容器可跨线程共享，[`Container::single_thread`] 产出的容器没有任何
/// 锁，也因此不是 `Sync`。
pub struct Container<P: LockPolicy = ThreadSafe> {
    name: String,
    indices: P::Cell<Indices<P>>,
}

impl Container<ThreadSafe> {
    /// 创建线程安全容器
    pub fn thread_safe(name: impl Into<String>) -> Arc<Self> {
        Self::with_policy(name)
    }
}

impl Container<SingleThread> {
    /// 创建单线程容器：无锁，由调用方保证单线程访问
    pub fn single_thread(name: impl Into<String>) -> Arc<Self> {
        Self::with_policy(name)
    }
}

impl<P: LockPolicy> Container<P> {
    /// 以显式策略创建容器
    pub fn with_policy(name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        debug!("容器 {name} - 创建，线程安全={}", P::THREAD_SAFE);
        Arc::new(Self {
            name,
            indices: P::Cell::new(Indices::default()),
        })
    }

    /// 容器名称
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 是否为线程安全配置
    #[must_use]
    pub const fn is_thread_safe(&self) -> bool {
        P::THREAD_SAFE
    }

    /// 注册携带生命周期能力的组件
    ///
    /// `depends_on` 中的名称必须已经注册。
    ///
    /// # Errors
    ///
    /// 名称冲突返回 [`ContainerError::DuplicateName`]，类型冲突返回
    /// [`ContainerError::DuplicateType`]，同一实例以不同名称重复注册
    /// 返回 [`ContainerError::DuplicateInstance`]，依赖名称未注册返回
    /// [`ContainerError::BeanNotFound`]。同一实例以同一名称重复注册不
    /// 报错，而是把 `depends_on` 中的新边补挂到既有描述符上。
    pub fn register_bean<T: Bean>(
        &self,
        instance: Arc<T>,
        name: &str,
        depends_on: &[&str],
    ) -> ContainerResult<Arc<BeanInfo<P>>> {
        let any_view: Arc<dyn Any + Send + Sync> = instance.clone();
        let lifecycle: Arc<dyn Bean> = instance;
        self.do_register(
            any_view,
            Some(lifecycle),
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            name,
            depends_on,
        )
    }

    /// 注册没有生命周期能力的组件：参与排序，但 init/destroy 为空操作
    ///
    /// # Errors
    ///
    /// 同 [`Container::register_bean`]。
    pub fn register_value<T: Any + Send + Sync>(
        &self,
        instance: Arc<T>,
        name: &str,
        depends_on: &[&str],
    ) -> ContainerResult<Arc<BeanInfo<P>>> {
        self.do_register(
            instance,
            None,
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            name,
            depends_on,
        )
    }

    /// 唯一的内部注册例程：四个索引的插入在同一个写临界区内完成
    fn do_register(
        &self,
        instance: Arc<dyn Any + Send + Sync>,
        lifecycle: Option<Arc<dyn Bean>>,
        type_id: TypeId,
        type_name: &'static str,
        name: &str,
        depends_on: &[&str],
    ) -> ContainerResult<Arc<BeanInfo<P>>> {
        let identity = Arc::as_ptr(&instance).cast::<()>() as usize;

        let (created, deps) = {
            let mut idx = self.indices.write();

            let deps = depends_on
                .iter()
                .map(|dep| {
                    idx.by_name.get(*dep).cloned().ok_or_else(|| {
                        ContainerError::BeanNotFound {
                            container: self.name.clone(),
                            key: (*dep).to_string(),
                        }
                    })
                })
                .collect::<ContainerResult<Vec<_>>>()?;

            if let Some(existing) = idx.by_instance.get(&identity).cloned() {
                if existing.primary_name() == name {
                    // 同一实例从第二个入口重复注册：退化为补挂依赖边，
                    // 支持多个持有者注册同一个单例的钻石构造图
                    drop(idx);
                    existing.depends_on(&deps)?;
                    debug!("容器 {} - bean {name} 已存在，补挂依赖边", self.name);
                    return Ok(existing);
                }
                return Err(ContainerError::DuplicateInstance {
                    container: self.name.clone(),
                    name: existing.primary_name().to_string(),
                });
            }

            if idx.by_name.contains_key(name) {
                return Err(ContainerError::DuplicateName {
                    container: self.name.clone(),
                    name: name.to_string(),
                });
            }
            if idx.by_type.contains_key(&type_id) {
                return Err(ContainerError::DuplicateType {
                    container: self.name.clone(),
                    type_name: type_name.to_string(),
                });
            }

            let created = BeanInfo::new(
                &self.name,
                name,
                type_id,
                type_name,
                idx.order.len(),
                instance,
                lifecycle,
            );
            idx.by_name.insert(name.to_string(), Arc::clone(&created));
            idx.by_type.insert(type_id, Arc::clone(&created));
            idx.by_instance.insert(identity, Arc::clone(&created));
            idx.order.push(Arc::clone(&created));
            (created, deps)
        };

        created.depends_on(&deps)?;
        debug!("容器 {} - 注册 bean: {created}", self.name);
        Ok(created)
    }

    /// 给描述符追加别名
    ///
    /// # Errors
    ///
    /// 别名与已有名称冲突返回 [`ContainerError::DuplicateName`]；描述符
    /// 不属于本容器返回 [`ContainerError::BeanNotFound`]。
    pub fn add_aliases(&self, bean: &Arc<BeanInfo<P>>, aliases: &[&str]) -> ContainerResult<()> {
        {
            let mut idx = self.indices.write();
            Self::ensure_owned(&self.name, &*idx, bean)?;

            for alias in aliases {
                if idx.by_name.contains_key(*alias) {
                    return Err(ContainerError::DuplicateName {
                        container: self.name.clone(),
                        name: (*alias).to_string(),
                    });
                }
            }
            for alias in aliases {
                idx.by_name.insert((*alias).to_string(), Arc::clone(bean));
            }
        }
        bean.add_names(aliases);
        Ok(())
    }

    /// 校验一组名称均未被占用
    ///
    /// # Errors
    ///
    /// 任一名称已注册返回 [`ContainerError::DuplicateName`]。
    pub fn ensure_names_free(&self, names: &[&str]) -> ContainerResult<()> {
        let idx = self.indices.read();
        for name in names {
            if idx.by_name.contains_key(*name) {
                return Err(ContainerError::DuplicateName {
                    container: self.name.clone(),
                    name: (*name).to_string(),
                });
            }
        }
        Ok(())
    }

    /// 校验一组名称均已注册
    ///
    /// # Errors
    ///
    /// 任一名称未注册返回 [`ContainerError::BeanNotFound`]。
    pub fn ensure_names_exist(&self, names: &[&str]) -> ContainerResult<()> {
        let idx = self.indices.read();
        for name in names {
            if !idx.by_name.contains_key(*name) {
                return Err(ContainerError::BeanNotFound {
                    container: self.name.clone(),
                    key: (*name).to_string(),
                });
            }
        }
        Ok(())
    }

    /// 按名称（或别名）查找描述符
    #[must_use]
    pub fn get_bean_info(&self, name: &str) -> Option<Arc<BeanInfo<P>>> {
        self.indices.read().by_name.get(name).cloned()
    }

    /// 按名称查找描述符，未命中报错
    ///
    /// # Errors
    ///
    /// 未注册返回 [`ContainerError::BeanNotFound`]。
    pub fn load_bean_info(&self, name: &str) -> ContainerResult<Arc<BeanInfo<P>>> {
        self.get_bean_info(name)
            .ok_or_else(|| ContainerError::BeanNotFound {
                container: self.name.clone(),
                key: name.to_string(),
            })
    }

    /// 按具体类型查找描述符
    #[must_use]
    pub fn get_bean_info_of<T: Any>(&self) -> Option<Arc<BeanInfo<P>>> {
        self.indices.read().by_type.get(&TypeId::of::<T>()).cloned()
    }

    /// 按具体类型查找描述符，未命中报错
    ///
    /// # Errors
    ///
    /// 未注册返回 [`ContainerError::BeanNotFound`]。
    pub fn load_bean_info_of<T: Any>(&self) -> ContainerResult<Arc<BeanInfo<P>>> {
        self.get_bean_info_of::<T>()
            .ok_or_else(|| ContainerError::BeanNotFound {
                container: self.name.clone(),
                key: std::any::type_name::<T>().to_string(),
            })
    }

    /// 按实例身份查找描述符：同一个 `Arc` 的克隆是同一个组件
    #[must_use]
    pub fn get_bean_info_by_instance<T>(&self, instance: &Arc<T>) -> Option<Arc<BeanInfo<P>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let identity = Arc::as_ptr(instance).cast::<()>() as usize;
        self.indices.read().by_instance.get(&identity).cloned()
    }

    /// 按实例身份查找描述符，未命中报错
    ///
    /// # Errors
    ///
    /// 未注册返回 [`ContainerError::BeanNotFound`]。
    pub fn load_bean_info_by_instance<T>(
        &self,
        instance: &Arc<T>,
    ) -> ContainerResult<Arc<BeanInfo<P>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_bean_info_by_instance(instance)
            .ok_or_else(|| ContainerError::BeanNotFound {
                container: self.name.clone(),
                key: format!("instance of {}", std::any::type_name::<T>()),
            })
    }

    /// 按名称取回实例
    #[must_use]
    pub fn get_bean<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get_bean_info(name)?.instance::<T>()
    }

    /// 按名称取回实例，未命中或类型不匹配报错
    ///
    /// # Errors
    ///
    /// 未注册或具体类型不是 `T` 时返回 [`ContainerError::BeanNotFound`]。
    pub fn load_bean<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let bean = self.load_bean_info(name)?;
        bean.instance::<T>()
            .ok_or_else(|| ContainerError::BeanNotFound {
                container: self.name.clone(),
                key: format!("{name} as {}", std::any::type_name::<T>()),
            })
    }

    /// 按具体类型取回实例
    #[must_use]
    pub fn get_bean_of<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_bean_info_of::<T>()?.instance::<T>()
    }

    /// 按具体类型取回实例，未命中报错
    ///
    /// # Errors
    ///
    /// 未注册返回 [`ContainerError::BeanNotFound`]。
    pub fn load_bean_of<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let bean = self.load_bean_info_of::<T>()?;
        bean.instance::<T>()
            .ok_or_else(|| ContainerError::BeanNotFound {
                container: self.name.clone(),
                key: std::any::type_name::<T>().to_string(),
            })
    }

    /// 声明描述符实现了接口 `I`，并登记预先转换好的 trait 对象视图
    ///
    /// 同一描述符对同一接口重复声明是幂等的。
    ///
    /// # Errors
    ///
    /// 描述符已初始化返回 [`ContainerError::AlreadyInited`]；描述符不
    /// 属于本容器返回 [`ContainerError::BeanNotFound`]。
    pub fn expose<I>(&self, bean: &Arc<BeanInfo<P>>, view: Arc<I>) -> ContainerResult<()>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        bean.ensure_not_inited()?;

        let mut idx = self.indices.write();
        Self::ensure_owned(&self.name, &*idx, bean)?;

        let entries = idx.by_interface.entry(TypeId::of::<I>()).or_default();
        if entries.iter().any(|e| Arc::ptr_eq(&e.info, bean)) {
            return Ok(());
        }
        // 列举顺序跟随注册顺序，与声明 expose 的先后无关
        let pos = entries.partition_point(|e| e.info.seq() < bean.seq());
        entries.insert(
            pos,
            InterfaceEntry {
                info: Arc::clone(bean),
                view: Box::new(view),
            },
        );
        Ok(())
    }

    /// 列举实现接口 `I` 的全部描述符，按注册顺序
    #[must_use]
    pub fn list_bean_infos_by_interface<I>(&self) -> Vec<Arc<BeanInfo<P>>>
    where
        I: ?Sized + 'static,
    {
        self.indices
            .read()
            .by_interface
            .get(&TypeId::of::<I>())
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.info)).collect())
            .unwrap_or_default()
    }

    /// 列举实现接口 `I` 的全部实例视图，按注册顺序
    #[must_use]
    pub fn list_beans_by_interface<I>(&self) -> Vec<Arc<I>>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.indices
            .read()
            .by_interface
            .get(&TypeId::of::<I>())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.view.downcast_ref::<Arc<I>>().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 让描述符依赖接口 `I` 的全部实现者，返回它们的视图
    ///
    /// # Errors
    ///
    /// 同 [`BeanInfo::depends_on`]。
    pub fn depends_on_interface<I>(&self, bean: &Arc<BeanInfo<P>>) -> ContainerResult<Vec<Arc<I>>>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let (views, deps) = {
            let idx = self.indices.read();
            idx.by_interface.get(&TypeId::of::<I>()).map_or_else(
                || (Vec::new(), Vec::new()),
                |entries| {
                    (
                        entries
                            .iter()
                            .filter_map(|e| e.view.downcast_ref::<Arc<I>>().cloned())
                            .collect(),
                        entries.iter().map(|e| Arc::clone(&e.info)).collect(),
                    )
                },
            )
        };
        bean.depends_on(&deps)?;
        Ok(views)
    }

    /// 按注册顺序初始化全部尚未初始化的组件，依赖先行
    ///
    /// # Errors
    ///
    /// 任一组件初始化失败即返回 [`ContainerError::InitFailed`] 并中止
    /// 剩余初始化；半启动的系统不应继续运行。
    pub fn refresh(&self) -> ContainerResult<()> {
        info!("容器 {} - 开始按依赖顺序初始化", self.name);
        for bean in self.snapshot_order() {
            bean.init()?;
        }
        info!("容器 {} - 初始化完成", self.name);
        Ok(())
    }

    /// 按注册顺序销毁全部已初始化的组件，依赖方先行
    ///
    /// 尽力而为：单个组件销毁失败只记录日志，遍历总会走完。
    pub fn destroy(&self) {
        info!("容器 {} - 开始按依赖顺序销毁", self.name);
        for bean in self.snapshot_order() {
            bean.destroy();
        }
        info!("容器 {} - 销毁完成", self.name);
    }

    fn snapshot_order(&self) -> Vec<Arc<BeanInfo<P>>> {
        self.indices.read().order.clone()
    }

    fn ensure_owned(
        container: &str,
        idx: &Indices<P>,
        bean: &Arc<BeanInfo<P>>,
    ) -> ContainerResult<()> {
        let owned = idx
            .by_name
            .get(bean.primary_name())
            .is_some_and(|registered| Arc::ptr_eq(registered, bean));
        if owned {
            Ok(())
        } else {
            Err(ContainerError::BeanNotFound {
                container: container.to_string(),
                key: bean.primary_name().to_string(),
            })
        }
    }
}

impl<P: LockPolicy> std::fmt::Debug for Container<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name)
            .field("thread_safe", &P::THREAD_SAFE)
            .finish_non_exhaustive()
    }
}
