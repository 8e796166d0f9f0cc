//! 生命周期编排集成测试：初始化顺序、销毁顺序、失败语义
use std::sync::Arc;

use bean_registry::Container;
use parking_lot::Mutex;
use registry_common::{Bean, BoxError, ContainerError};

/// 按事件日志记录 init/destroy 的测试组件
struct Probe {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail_init: bool,
    fail_destroy: bool,
}

impl Probe {
    fn new(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label,
            log: Arc::clone(log),
            fail_init: false,
            fail_destroy: false,
        }
    }

    fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }
}

impl Bean for Probe {
    fn init(&self) -> Result<(), BoxError> {
        if self.fail_init {
            return Err(format!("{} 初始化失败", self.label).into());
        }
        self.log.lock().push(format!("init:{}", self.label));
        Ok(())
    }

    fn destroy(&self) -> Result<(), BoxError> {
        if self.fail_destroy {
            return Err(format!("{} 销毁失败", self.label).into());
        }
        self.log.lock().push(format!("destroy:{}", self.label));
        Ok(())
    }
}

#[test]
fn test_init_follows_dependencies_destroy_reverses() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::thread_safe("lifecycle");

    // 注册顺序故意与依赖顺序相反
    container
        .register_bean(Arc::new(Probe::new("api", &log)), "api", &[])
        .unwrap();
    container
        .register_bean(Arc::new(Probe::new("cache", &log)), "cache", &[])
        .unwrap();
    container
        .register_bean(Arc::new(Probe::new("db", &log)), "db", &[])
        .unwrap();

    let api = container.load_bean_info("api").unwrap();
    let cache = container.load_bean_info("cache").unwrap();
    api.depends_on(&[Arc::clone(&cache)]).unwrap();
    cache
        .depends_on(&[container.load_bean_info("db").unwrap()])
        .unwrap();

    container.refresh().unwrap();
    assert_eq!(
        *log.lock(),
        vec!["init:db", "init:cache", "init:api"],
        "依赖方初始化前其依赖必须已初始化"
    );

    log.lock().clear();
    container.destroy();
    assert_eq!(
        *log.lock(),
        vec!["destroy:api", "destroy:cache", "destroy:db"],
        "销毁顺序与初始化顺序相反"
    );
}

#[test]
fn test_refresh_is_idempotent() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::thread_safe("lifecycle");
    container
        .register_bean(Arc::new(Probe::new("db", &log)), "db", &[])
        .unwrap();

    container.refresh().unwrap();
    container.refresh().unwrap();
    assert_eq!(log.lock().len(), 1, "已初始化的组件不会被再次初始化");
}

#[test]
fn test_init_failure_aborts_refresh() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::thread_safe("lifecycle");
    container
        .register_bean(Arc::new(Probe::new("db", &log)), "db", &[])
        .unwrap();
    container
        .register_bean(
            Arc::new(Probe::new("cache", &log).failing_init()),
            "cache",
            &["db"],
        )
        .unwrap();
    container
        .register_bean(Arc::new(Probe::new("api", &log)), "api", &["cache"])
        .unwrap();

    let err = container.refresh().unwrap_err();
    assert!(matches!(err, ContainerError::InitFailed { ref bean, .. } if bean == "cache"));
    assert_eq!(*log.lock(), vec!["init:db"], "失败点之后的组件不再初始化");
    assert!(!container.load_bean_info("api").unwrap().is_inited());
}

#[test]
fn test_destroy_is_best_effort() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::thread_safe("lifecycle");
    container
        .register_bean(Arc::new(Probe::new("db", &log)), "db", &[])
        .unwrap();
    container
        .register_bean(
            Arc::new(Probe::new("cache", &log).failing_destroy()),
            "cache",
            &["db"],
        )
        .unwrap();
    container
        .register_bean(Arc::new(Probe::new("api", &log)), "api", &["cache"])
        .unwrap();

    container.refresh().unwrap();
    log.lock().clear();
    container.destroy();

    // cache 销毁失败只记日志，api 与 db 照常销毁，inited 一律清除
    assert_eq!(*log.lock(), vec!["destroy:api", "destroy:db"]);
    for name in ["api", "cache", "db"] {
        assert!(!container.load_bean_info(name).unwrap().is_inited());
    }
}

#[test]
fn test_destroyed_container_can_refresh_again() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::thread_safe("lifecycle");
    container
        .register_bean(Arc::new(Probe::new("db", &log)), "db", &[])
        .unwrap();

    container.refresh().unwrap();
    container.destroy();
    container.refresh().unwrap();
    assert_eq!(*log.lock(), vec!["init:db", "destroy:db", "init:db"]);
}
