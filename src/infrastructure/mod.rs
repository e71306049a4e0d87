//! 基础设施层
//!
//! - 依赖注入容器
//! - 服务提供者与模块注册
//! - 组装根

pub mod composition;
pub mod container;
pub mod provider;

// 重新导出API
pub use container::{ContainerStats, Environment, ServiceContainer, ServiceLifetime};
pub use provider::{register_modules, ServiceModule, ServiceType};
