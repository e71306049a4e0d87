//! 组装根（composition root）
//!
//! 进程级默认容器只应由程序入口在启动时通过 [`install`] 设置一次，
//! 其余代码通过构造函数显式接收依赖。[`inject`] 只用于组装阶段，
//! 缺少依赖时立即 panic，而不是推迟到首次使用。

use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::sync::Arc;

use super::container::ServiceContainer;

lazy_static! {
    static ref ROOT: RwLock<Option<ServiceContainer>> = RwLock::new(None);
}

/// 设置进程级默认容器，返回之前安装的容器
pub fn install(container: ServiceContainer) -> Option<ServiceContainer> {
    let previous = ROOT.write().replace(container);
    if previous.is_some() {
        tracing::warn!("composition root replaced an installed container");
    }
    previous
}

/// 移除进程级默认容器
pub fn uninstall() -> Option<ServiceContainer> {
    ROOT.write().take()
}

pub fn installed() -> Option<ServiceContainer> {
    ROOT.read().clone()
}

/// # Panics
/// Panics when no container has been installed.
pub fn global() -> ServiceContainer {
    installed().unwrap_or_else(|| panic!("no service container installed in the composition root"))
}

/// 从默认容器解析依赖
///
/// # Panics
/// Panics when no container is installed or `T` is not registered.
pub fn inject<T: ?Sized + Send + Sync + 'static>() -> Arc<T> {
    global().inject::<T>()
}
