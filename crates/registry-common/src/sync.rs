//! 读写守卫抽象
//!
//! 容器有两种固定于构造期的并发配置：线程安全模式使用
//! `parking_lot::RwLock`，单线程模式使用 `RefCell`（完全没有锁）。
//! 两种配置通过 [`LockPolicy`] 在类型层面区分：单线程容器因含有
//! `RefCell` 而不是 `Sync`，跨线程使用会直接编译失败，而不是在运行时
//! 退化成空操作锁。

use std::cell::{Ref, RefCell, RefMut};
use std::ops::{Deref, DerefMut};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 状态单元抽象
///
/// `read` / `write` 返回 RAII 守卫，离开作用域（包括 panic 展开路径）
/// 自动释放。
pub trait StateCell<T: 'static>: 'static {
    /// 读守卫类型
    type ReadGuard<'a>: Deref<Target = T>
    where
        Self: 'a;

    /// 写守卫类型
    type WriteGuard<'a>: DerefMut<Target = T>
    where
        Self: 'a;

    /// 包装初始值
    fn new(value: T) -> Self;

    /// 获取读访问
    fn read(&self) -> Self::ReadGuard<'_>;

    /// 获取写访问
    fn write(&self) -> Self::WriteGuard<'_>;
}

impl<T: 'static> StateCell<T> for RwLock<T> {
    type ReadGuard<'a> = RwLockReadGuard<'a, T>;
    type WriteGuard<'a> = RwLockWriteGuard<'a, T>;

    fn new(value: T) -> Self {
        Self::new(value)
    }

    fn read(&self) -> Self::ReadGuard<'_> {
        RwLock::read(self)
    }

    fn write(&self) -> Self::WriteGuard<'_> {
        RwLock::write(self)
    }
}

impl<T: 'static> StateCell<T> for RefCell<T> {
    type ReadGuard<'a> = Ref<'a, T>;
    type WriteGuard<'a> = RefMut<'a, T>;

    fn new(value: T) -> Self {
        Self::new(value)
    }

    fn read(&self) -> Self::ReadGuard<'_> {
        self.borrow()
    }

    fn write(&self) -> Self::WriteGuard<'_> {
        self.borrow_mut()
    }
}

/// 并发配置策略
///
/// 在容器构造时一次性选定，之后所有容器索引与描述符状态都使用同一种
/// 状态单元。
pub trait LockPolicy: Sized + 'static {
    /// 该策略下的状态单元类型
    type Cell<T: 'static>: StateCell<T>;

    /// 是否线程安全
    const THREAD_SAFE: bool;
}

/// 线程安全策略：读写锁保护，容器可被任意线程并发访问
pub struct ThreadSafe;

impl LockPolicy for ThreadSafe {
    type Cell<T: 'static> = RwLock<T>;

    const THREAD_SAFE: bool = true;
}

/// 单线程策略：无锁，容器类型不是 `Sync`，由调用方保证单线程访问
pub struct SingleThread;

impl LockPolicy for SingleThread {
    type Cell<T: 'static> = RefCell<T>;

    const THREAD_SAFE: bool = false;
}
