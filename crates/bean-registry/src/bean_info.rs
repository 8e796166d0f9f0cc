//! 组件描述符
//!
//! 每个注册实例对应一个 [`BeanInfo`]：持有实例视图、注册时捕获的生命
//! 周期句柄、主名称与别名集合、初始化标记以及两个方向的依赖边。描述符
//! 一经创建便永久留在容器索引中，`inited` 标记随 refresh/destroy 循环
//! 翻转。

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use registry_common::{Bean, ContainerError, ContainerResult, LockPolicy, StateCell};
use tracing::{debug, error};

/// 描述符的可变状态，整体置于策略状态单元之内
struct BeanState<P: LockPolicy> {
    /// 主名称加全部别名
    names: BTreeSet<String>,
    /// 是否已完成初始化
    inited: bool,
    /// 出边：依赖名称 → 必须先初始化的描述符，保持声明顺序
    depends_on: Vec<(String, Arc<BeanInfo<P>>)>,
    /// 入边：依赖方名称 → 依赖本组件的描述符，保持声明顺序
    depended_by: Vec<(String, Arc<BeanInfo<P>>)>,
}

/// 组件描述符
pub struct BeanInfo<P: LockPolicy> {
    /// 所属容器名称，仅用于日志与错误信息
    container: String,
    /// 首次注册时的名称
    primary_name: String,
    /// 实例的具体类型
    type_id: TypeId,
    /// 实例的类型名称
    type_name: &'static str,
    /// 容器内的注册序号，接口列举按它排序
    seq: usize,
    /// 实例的共享视图，容器按身份（数据指针地址）索引它
    instance: Arc<dyn Any + Send + Sync>,
    /// 注册时捕获的生命周期句柄；`None` 表示生命周期为空操作
    lifecycle: Option<Arc<dyn Bean>>,
    /// 描述符自身的状态单元，独立于容器索引的锁
    state: P::Cell<BeanState<P>>,
}

impl<P: LockPolicy> BeanInfo<P> {
    pub(crate) fn new(
        container: &str,
        primary_name: &str,
        type_id: TypeId,
        type_name: &'static str,
        seq: usize,
        instance: Arc<dyn Any + Send + Sync>,
        lifecycle: Option<Arc<dyn Bean>>,
    ) -> Arc<Self> {
        let mut names = BTreeSet::new();
        names.insert(primary_name.to_string());

        Arc::new(Self {
            container: container.to_string(),
            primary_name: primary_name.to_string(),
            type_id,
            type_name,
            seq,
            instance,
            lifecycle,
            state: P::Cell::new(BeanState {
                names,
                inited: false,
                depends_on: Vec::new(),
                depended_by: Vec::new(),
            }),
        })
    }

    /// 首次注册时的名称
    #[must_use]
    pub fn primary_name(&self) -> &str {
        &self.primary_name
    }

    /// 主名称加全部别名的快照
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.state.read().names.iter().cloned().collect()
    }

    /// 实例的具体类型
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 实例的类型名称
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn seq(&self) -> usize {
        self.seq
    }

    /// 是否携带生命周期能力
    #[must_use]
    pub fn has_lifecycle(&self) -> bool {
        self.lifecycle.is_some()
    }

    /// 是否已完成初始化
    #[must_use]
    pub fn is_inited(&self) -> bool {
        self.state.read().inited
    }

    /// 以具体类型取回实例；类型不匹配返回 `None`
    #[must_use]
    pub fn instance<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.instance).downcast::<T>().ok()
    }

    /// 实例的类型擦除视图
    #[must_use]
    pub fn raw_instance(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.instance
    }

    /// 本组件是否直接依赖名为 `name` 的组件
    #[must_use]
    pub fn does_depend_on(&self, name: &str) -> bool {
        self.state.read().depends_on.iter().any(|(n, _)| n == name)
    }

    /// 名为 `name` 的组件是否直接依赖本组件
    #[must_use]
    pub fn is_depended_by(&self, name: &str) -> bool {
        self.state.read().depended_by.iter().any(|(n, _)| n == name)
    }

    /// 依赖名称快照，保持声明顺序
    #[must_use]
    pub fn depends_on_names(&self) -> Vec<String> {
        self.state
            .read()
            .depends_on
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// 校验尚未初始化；初始化之后依赖集合即冻结
    ///
    /// # Errors
    ///
    /// 已初始化时返回 [`ContainerError::AlreadyInited`]。
    pub fn ensure_not_inited(&self) -> ContainerResult<()> {
        if self.is_inited() {
            return Err(ContainerError::AlreadyInited {
                bean: self.primary_name.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn add_names(&self, aliases: &[&str]) {
        let mut st = self.state.write();
        for alias in aliases {
            st.names.insert((*alias).to_string());
        }
    }

    /// 声明依赖关系：`deps` 中的组件必须先于本组件初始化
    ///
    /// 幂等：已存在的边被跳过。环检测先在不持写锁的快照上做完整可达性
    /// 遍历，随后对每条边按地址顺序同时锁定两端描述符，在锁内复查直接
    /// 回边并写入双向边。
    ///
    /// # Errors
    ///
    /// 本组件已初始化时返回 [`ContainerError::AlreadyInited`]；新边会
    /// 构成环时返回 [`ContainerError::CyclicDependency`]。
    pub fn depends_on(self: &Arc<Self>, deps: &[Arc<Self>]) -> ContainerResult<()> {
        self.ensure_not_inited()?;

        for dep in deps {
            if Arc::ptr_eq(self, dep) || dep.reaches(self) {
                return Err(ContainerError::CyclicDependency {
                    bean: self.primary_name.clone(),
                    dependency: dep.primary_name.clone(),
                });
            }
        }

        for dep in deps {
            self.link(dep)?;
        }
        Ok(())
    }

    /// 插入一条 `self → dep` 的边，同时维护 dep 的入边
    fn link(self: &Arc<Self>, dep: &Arc<Self>) -> ContainerResult<()> {
        // 固定按地址顺序加锁，双向并发声明不会互相等待
        let (mut mine, mut theirs) = if Self::key_of(self) < Self::key_of(dep) {
            let a = self.state.write();
            let b = dep.state.write();
            (a, b)
        } else {
            let b = dep.state.write();
            let a = self.state.write();
            (a, b)
        };

        if mine.inited {
            return Err(ContainerError::AlreadyInited {
                bean: self.primary_name.clone(),
            });
        }
        if mine
            .depends_on
            .iter()
            .any(|(n, _)| n == &dep.primary_name)
        {
            return Ok(());
        }
        if theirs
            .depends_on
            .iter()
            .any(|(n, _)| n == &self.primary_name)
        {
            return Err(ContainerError::CyclicDependency {
                bean: self.primary_name.clone(),
                dependency: dep.primary_name.clone(),
            });
        }

        mine.depends_on
            .push((dep.primary_name.clone(), Arc::clone(dep)));
        theirs
            .depended_by
            .push((self.primary_name.clone(), Arc::clone(self)));
        Ok(())
    }

    /// 沿出边做可达性遍历，判断能否到达 `target`
    fn reaches(self: &Arc<Self>, target: &Arc<Self>) -> bool {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack = vec![Arc::clone(self)];

        while let Some(current) = stack.pop() {
            if Arc::ptr_eq(&current, target) {
                return true;
            }
            if !visited.insert(Self::key_of(&current)) {
                continue;
            }
            let deps: Vec<Arc<Self>> = current
                .state
                .read()
                .depends_on
                .iter()
                .map(|(_, d)| Arc::clone(d))
                .collect();
            stack.extend(deps);
        }
        false
    }

    fn key_of(info: &Arc<Self>) -> usize {
        Arc::as_ptr(info) as usize
    }

    /// 深度优先初始化：先初始化全部依赖，再调用自身的生命周期回调
    ///
    /// 已初始化的描述符直接返回，钻石依赖不会被重复初始化。
    ///
    /// # Errors
    ///
    /// 组件 `init()` 失败时返回 [`ContainerError::InitFailed`]，整个
    /// 初始化流程就地中止。
    pub fn init(&self) -> ContainerResult<()> {
        let deps: Vec<Arc<Self>> = {
            let st = self.state.read();
            if st.inited {
                return Ok(());
            }
            st.depends_on.iter().map(|(_, d)| Arc::clone(d)).collect()
        };

        for dep in deps {
            dep.init()?;
        }

        let mut st = self.state.write();
        if st.inited {
            return Ok(());
        }
        if let Some(lifecycle) = &self.lifecycle {
            debug!("容器 {} - bean {} - 初始化", self.container, self.primary_name);
            lifecycle
                .init()
                .map_err(|source| ContainerError::InitFailed {
                    bean: self.primary_name.clone(),
                    source,
                })?;
        }
        st.inited = true;
        Ok(())
    }

    /// 反向销毁：先销毁全部依赖方，再调用自身的生命周期回调
    ///
    /// 销毁是尽力而为的：回调失败只记录日志并返回 `false`，`inited`
    /// 标记无论成败都会清除，描述符回到可再次初始化的状态。
    pub fn destroy(&self) -> bool {
        let dependents: Vec<Arc<Self>> = {
            let st = self.state.read();
            if !st.inited {
                return true;
            }
            st.depended_by.iter().map(|(_, d)| Arc::clone(d)).collect()
        };

        for dependent in dependents {
            dependent.destroy();
        }

        let mut st = self.state.write();
        if !st.inited {
            return true;
        }
        let ok = match &self.lifecycle {
            Some(lifecycle) => {
                debug!("容器 {} - bean {} - 销毁", self.container, self.primary_name);
                match lifecycle.destroy() {
                    Ok(()) => true,
                    Err(e) => {
                        error!(
                            "容器 {} - bean {} - 销毁失败: {e}",
                            self.container, self.primary_name
                        );
                        false
                    }
                }
            }
            None => true,
        };
        st.inited = false;
        ok
    }
}

impl<P: LockPolicy> fmt::Debug for BeanInfo<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.read();
        f.debug_struct("BeanInfo")
            .field("container", &self.container)
            .field("primary_name", &self.primary_name)
            .field("names", &st.names)
            .field("type_name", &self.type_name)
            .field("seq", &self.seq)
            .field("inited", &st.inited)
            .finish_non_exhaustive()
    }
}

impl<P: LockPolicy> fmt::Display for BeanInfo<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.read();
        write!(
            f,
            "names={:?}, class={}, inited={}",
            st.names, self.type_name, st.inited
        )
    }
}
