//! 装配流程集成测试：环境容器、分阶段装配、适配器自注册
use std::sync::Arc;

use bean_registry::{BeanAdapter, Container};
use parking_lot::Mutex;
use registry_common::{Bean, BoxError, ContainerError, ThreadSafe};

struct Db;
impl Bean for Db {}

struct Api;
impl Bean for Api {}

/// 模拟不受我们控制的第三方连接池
struct LegacyPool {
    open: Mutex<bool>,
}

#[test]
fn test_build_installs_ambient_without_initializing() {
    let container = Container::thread_safe("app");
    container
        .build(|c| {
            c.register_bean(Arc::new(Db), "db", &[])?;
            c.register_bean(Arc::new(Api), "api", &["db"])?;
            Ok(())
        })
        .unwrap();

    // build 只装配；初始化由调用方在合适的时机触发
    assert!(Container::<ThreadSafe>::current().is_none());
    assert!(!container.load_bean_info("db").unwrap().is_inited());

    container.refresh().unwrap();
    assert!(container.load_bean_info("db").unwrap().is_inited());
    assert!(container.load_bean_info("api").unwrap().is_inited());
}

#[test]
fn test_build_on_prepopulated_container() {
    let container = Container::thread_safe("app");
    container.register_bean(Arc::new(Db), "db", &[]).unwrap();

    container
        .build(|c| {
            c.register_bean(Arc::new(Api), "api", &["db"])?;
            Ok(())
        })
        .unwrap();

    assert!(container.load_bean_info("api").unwrap().does_depend_on("db"));
}

#[test]
fn test_bootstrap_creates_builds_and_refreshes() {
    let container = Container::<ThreadSafe>::bootstrap("app", |c| {
        c.register_bean(Arc::new(Db), "db", &[])?;
        c.register_bean(Arc::new(Api), "api", &["db"])?;
        Ok(())
    })
    .unwrap();

    assert!(Container::<ThreadSafe>::current().is_none());
    assert!(container.load_bean_info("db").unwrap().is_inited());
    assert!(container.load_bean_info("api").unwrap().is_inited());
}

#[test]
fn test_deep_constructor_uses_ambient_container() {
    // 构造代码不接收容器参数，通过环境容器自行注册
    fn make_db() -> Result<Arc<Db>, BoxError> {
        let db = Arc::new(Db);
        let container = Container::<ThreadSafe>::load_current()?;
        container.register_bean(Arc::clone(&db), "db", &[])?;
        Ok(db)
    }

    let container = Container::<ThreadSafe>::bootstrap("app", |c| {
        let db = make_db()?;
        c.register_bean(Arc::new(Api), "api", &["db"])?;
        assert!(c.get_bean_info_by_instance(&db).is_some());
        Ok(())
    })
    .unwrap();

    assert!(container.load_bean_info("db").unwrap().is_inited());
}

#[test]
fn test_nested_build_rejected_on_same_thread() {
    let outer = Container::thread_safe("outer");
    outer
        .build(|_| {
            let inner = Container::thread_safe("inner");
            let err = inner.build(|_| Ok(())).unwrap_err();
            assert!(matches!(err, ContainerError::ReentrantBuild { .. }));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_parallel_builds_do_not_interfere() {
    // ReentrantBuild 只约束同一线程，不同线程可以同时装配各自的容器
    let handle = std::thread::spawn(|| {
        Container::<ThreadSafe>::bootstrap("worker", |c| {
            c.register_bean(Arc::new(Db), "db", &[])?;
            Ok(())
        })
        .unwrap()
    });

    let main = Container::<ThreadSafe>::bootstrap("main", |c| {
        c.register_bean(Arc::new(Api), "api", &[])?;
        Ok(())
    })
    .unwrap();

    let worker = handle.join().unwrap();
    assert!(main.get_bean_info("api").is_some());
    assert!(worker.get_bean_info("db").is_some());
}

#[test]
fn test_callback_failure_wrapped_and_cleaned_up() {
    let container = Container::thread_safe("app");
    let err = container
        .build(|c| {
            c.register_bean(Arc::new(Db), "db", &[])?;
            Err("数据源配置缺失".into())
        })
        .unwrap_err();

    assert!(matches!(err, ContainerError::BuildFailed { ref container, .. } if container == "app"));
    assert!(Container::<ThreadSafe>::current().is_none());
}

#[test]
fn test_init_failure_during_bootstrap_propagates() {
    struct Broken;
    impl Bean for Broken {
        fn init(&self) -> Result<(), BoxError> {
            Err("启动失败".into())
        }
    }

    let err = Container::<ThreadSafe>::bootstrap("app", |c| {
        c.register_bean(Arc::new(Broken), "broken", &[])?;
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(err, ContainerError::InitFailed { ref bean, .. } if bean == "broken"));
    assert!(Container::<ThreadSafe>::current().is_none());
}

#[test]
fn test_adapter_self_registers_against_ambient() {
    let pool = Arc::new(LegacyPool {
        open: Mutex::new(false),
    });

    let pool_for_build = Arc::clone(&pool);
    let container = Container::<ThreadSafe>::bootstrap("app", move |c| {
        BeanAdapter::new(pool_for_build)
            .with_name("pool")
            .on_init(|p: &LegacyPool| {
                *p.open.lock() = true;
                Ok(())
            })
            .on_destroy(|p: &LegacyPool| {
                *p.open.lock() = false;
                Ok(())
            })
            .register::<ThreadSafe>(&[])?;
        c.register_bean(Arc::new(Api), "api", &["pool"])?;
        Ok(())
    })
    .unwrap();

    assert!(*pool.open.lock(), "refresh 触发适配器的 init 钩子");
    container.destroy();
    assert!(!*pool.open.lock(), "destroy 触发适配器的 destroy 钩子");
}

#[test]
fn test_adapter_register_outside_build_fails() {
    let result = BeanAdapter::new(Arc::new(LegacyPool {
        open: Mutex::new(false),
    }))
    .register::<ThreadSafe>(&[]);
    assert!(matches!(
        result.unwrap_err(),
        ContainerError::NoActiveContainer
    ));
}

#[test]
fn test_global_container_accessor() {
    let container = Container::thread_safe("global-test");
    container.register_bean(Arc::new(Db), "db", &[]).unwrap();
    bean_registry::set_global_container(Arc::clone(&container));

    let fetched = bean_registry::global_container().unwrap();
    assert!(fetched.get_bean_info("db").is_some());
}
