//! 错误类型定义

use thiserror::Error;

/// 组件 init/destroy 回调返回的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 容器错误类型
#[derive(Error, Debug)]
pub enum ContainerError {
    /// 注册时名称冲突
    #[error("容器 {container} - Bean 名称已注册: {name}")]
    DuplicateName {
        /// 容器名称
        container: String,
        /// 冲突的 Bean 名称或别名
        name: String,
    },

    /// 注册时具体类型冲突
    #[error("容器 {container} - Bean 类型已注册: {type_name}")]
    DuplicateType {
        /// 容器名称
        container: String,
        /// 冲突的类型名称
        type_name: String,
    },

    /// 同一实例以不同名称重复注册
    #[error("容器 {container} - Bean 实例已注册: {name}")]
    DuplicateInstance {
        /// 容器名称
        container: String,
        /// 实例已有的主名称
        name: String,
    },

    /// 依赖边插入时检测到循环依赖
    #[error("bean {bean} - 检测到循环依赖: {dependency}")]
    CyclicDependency {
        /// 发起依赖声明的 Bean
        bean: String,
        /// 构成环的依赖 Bean
        dependency: String,
    },

    /// 初始化之后禁止再修改依赖关系
    #[error("bean {bean} - 已初始化，禁止修改依赖关系")]
    AlreadyInited {
        /// 已初始化的 Bean 名称
        bean: String,
    },

    /// load 系列查找未命中
    #[error("容器 {container} - Bean 未找到: {key}")]
    BeanNotFound {
        /// 容器名称
        container: String,
        /// 查找键（名称、类型或实例描述）
        key: String,
    },

    /// 组件 init() 失败，refresh 就地中止
    #[error("bean {bean} - 初始化失败")]
    InitFailed {
        /// 初始化失败的 Bean 名称
        bean: String,
        /// 组件抛出的原始错误
        source: BoxError,
    },

    /// 当前线程已有正在进行的 build，禁止嵌套
    #[error("容器 {container} - 当前线程已有正在进行的 build")]
    ReentrantBuild {
        /// 容器名称
        container: String,
    },

    /// 当前线程没有激活的容器
    #[error("当前线程没有激活的容器")]
    NoActiveContainer,

    /// build 回调执行失败
    #[error("容器 {container} - 构建失败")]
    BuildFailed {
        /// 容器名称
        container: String,
        /// 回调返回的原始错误
        source: BoxError,
    },
}

/// 容器操作结果类型别名
pub type ContainerResult<T> = Result<T, ContainerError>;
