//! 服务提供者
//!
//! - [`ServiceType`]：类型自行描述如何从容器构造自身
//! - [`ServiceModule`]：组装根按环境批量注册服务

use super::container::{Environment, ServiceContainer};
use std::sync::Arc;

/// 能够从容器构造自身的服务类型
pub trait ServiceType: Send + Sync + 'static {
    fn make_service(container: &ServiceContainer) -> Arc<Self>;
}

/// 一组相关服务的注册逻辑
pub trait ServiceModule: Send + Sync {
    /// 模块名称
    fn name(&self) -> &str;

    /// 模块适用的环境；为空表示适用于所有环境
    fn environments(&self) -> &[Environment] {
        &[]
    }

    /// 向容器注册服务
    fn register(&self, container: &ServiceContainer);

    fn applies_to(&self, environment: Environment) -> bool {
        let environments = self.environments();
        environments.is_empty() || environments.contains(&environment)
    }
}

/// 注册所有适用于容器当前环境的模块，返回实际注册的模块数
pub fn register_modules(container: &ServiceContainer, modules: &[Box<dyn ServiceModule>]) -> usize {
    let environment = container.environment();
    let mut registered = 0;
    for module in modules {
        if !module.applies_to(environment) {
            tracing::debug!(module = module.name(), %environment, "module skipped");
            continue;
        }
        module.register(container);
        registered += 1;
        tracing::debug!(module = module.name(), %environment, "module registered");
    }
    registered
}
