//! 服务容器实现
//!
//! 按类型键保存已构造的服务实例，支持三种使用方式：
//! - `create`：临时创建，不缓存
//! - `register`：创建并缓存（覆盖已有条目）
//! - `singleton`：已缓存则复用，否则创建并缓存
//!
//! 容器可以 `Clone`，所有克隆共享同一份注册表。

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::environment::Environment;
use super::key::{KeyStrategy, ServiceKey, TypeDescriptor, TypeIdKey, TypeNameKey};
use super::ServiceLifetime;
use crate::config::ServiceConfig;
use crate::errors::ContainerError;
use crate::infrastructure::provider::ServiceType;

/// 注册表中的一个条目，`instance` 内部保存 `Arc<T>`
struct Entry {
    instance: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
    lifetime: ServiceLifetime,
}

impl Entry {
    fn new<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>, lifetime: ServiceLifetime) -> Self {
        Self {
            instance: Box::new(instance),
            type_name: std::any::type_name::<T>(),
            lifetime,
        }
    }

    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.downcast_ref::<Arc<T>>().cloned()
    }
}

/// 不同类型的短名称相同时会互相覆盖
fn warn_on_collision(key: &ServiceKey, previous: &'static str, replacing: &'static str) {
    if previous != replacing {
        tracing::warn!(service = %key, previous, replacing, "service key collision; entry replaced");
    }
}

/// 内部容器统计信息（原子计数器）
#[derive(Default)]
struct InnerStats {
    lookups: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
    constructions: AtomicUsize,
}

/// 当前环境及其代数，每次切换环境代数加一
struct EnvironmentState {
    current: Environment,
    generation: u64,
}

/// 服务容器
#[derive(Clone)]
pub struct ServiceContainer {
    services: Arc<DashMap<ServiceKey, Entry>>,
    environment: Arc<RwLock<EnvironmentState>>,
    keys: Arc<dyn KeyStrategy>,
    stats: Arc<InnerStats>,
}

impl ServiceContainer {
    /// 创建生产环境下的空容器
    pub fn new() -> Self {
        Self::with_environment(Environment::Production)
    }

    pub fn with_environment(environment: Environment) -> Self {
        Self::with_key_strategy(environment, Arc::new(TypeNameKey))
    }

    /// 使用自定义键策略创建容器
    pub fn with_key_strategy(environment: Environment, keys: Arc<dyn KeyStrategy>) -> Self {
        Self {
            services: Arc::new(DashMap::new()),
            environment: Arc::new(RwLock::new(EnvironmentState {
                current: environment,
                generation: 0,
            })),
            keys,
            stats: Arc::new(InnerStats::default()),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let keys: Arc<dyn KeyStrategy> = if config.type_id_keys {
            Arc::new(TypeIdKey)
        } else {
            Arc::new(TypeNameKey)
        };
        Self::with_key_strategy(config.environment, keys)
    }

    pub fn environment(&self) -> Environment {
        self.environment.read().current
    }

    /// 切换环境并清空所有已缓存的服务（包括单例）
    ///
    /// 切换前已开始执行的工厂，其结果仍会返回给调用方，但不会写入新环境的缓存。
    pub fn set_environment(&self, environment: Environment) {
        let mut state = self.environment.write();
        let dropped = self.services.len();
        state.current = environment;
        state.generation += 1;
        self.services.clear();
        tracing::debug!(%environment, dropped, "container environment switched");
    }

    fn generation(&self) -> u64 {
        self.environment.read().generation
    }

    /// 类型 `T` 在当前键策略下的键
    pub fn key_for<T: ?Sized + 'static>(&self) -> ServiceKey {
        self.keys.key(&TypeDescriptor::of::<T>())
    }

    /// 调用工厂创建实例，不缓存
    pub fn create<T, F>(&self, factory: F) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&ServiceContainer) -> Arc<T>,
    {
        self.stats.constructions.fetch_add(1, Ordering::Relaxed);
        factory(self)
    }

    /// 使用类型自带的构造方式创建实例，不缓存
    pub fn create_service<S: ServiceType>(&self) -> Arc<S> {
        self.create(S::make_service)
    }

    /// 创建实例并按 `T` 的键缓存，覆盖已有条目
    pub fn register<T, F>(&self, factory: F) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&ServiceContainer) -> Arc<T>,
    {
        match self.try_register::<T, Infallible, _>(|c| Ok(factory(c))) {
            Ok(instance) => instance,
            Err(never) => match never {},
        }
    }

    /// 工厂失败时不写入任何条目，错误原样返回
    pub fn try_register<T, E, F>(&self, factory: F) -> Result<Arc<T>, E>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&ServiceContainer) -> Result<Arc<T>, E>,
    {
        self.stats.constructions.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation();
        let instance = factory(self)?;
        let key = self.key_for::<T>();

        // 持有环境读锁直到写入完成，与 set_environment 的清空互斥
        let state = self.environment.read();
        if state.generation != generation {
            tracing::debug!(service = %key, "environment switched during construction; not cached");
            return Ok(instance);
        }
        tracing::debug!(service = %key, "service registered");
        let entry = Entry::new(instance.clone(), ServiceLifetime::Registered);
        let replacing = entry.type_name;
        if let Some(previous) = self.services.insert(key.clone(), entry) {
            warn_on_collision(&key, previous.type_name, replacing);
        }
        Ok(instance)
    }

    pub fn register_service<S: ServiceType>(&self) -> Arc<S> {
        self.register(S::make_service)
    }

    /// 移除 `T` 的条目；条目不存在或类型不符时返回 `None`
    pub fn unregister<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let key = self.key_for::<T>();
        let (_, entry) = self.services.remove(&key)?;
        tracing::debug!(service = %key, "service unregistered");
        entry.get::<T>()
    }

    /// 返回已缓存的同类型实例；否则与 `register` 相同
    ///
    /// 多个线程同时首次调用时工厂可能执行多次，但只有一个实例会被缓存，
    /// 所有调用方拿到的都是这个实例。
    pub fn singleton<T, F>(&self, factory: F) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&ServiceContainer) -> Arc<T>,
    {
        match self.try_singleton::<T, Infallible, _>(|c| Ok(factory(c))) {
            Ok(instance) => instance,
            Err(never) => match never {},
        }
    }

    pub fn try_singleton<T, E, F>(&self, factory: F) -> Result<Arc<T>, E>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&ServiceContainer) -> Result<Arc<T>, E>,
    {
        let key = self.key_for::<T>();
        // 工厂可能递归访问容器，调用前必须释放分片锁
        let cached = self.services.get(&key).and_then(|entry| entry.get::<T>());
        if let Some(instance) = cached {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(instance);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        self.stats.constructions.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation();
        let instance = factory(self)?;

        let state = self.environment.read();
        if state.generation != generation {
            tracing::debug!(service = %key, "environment switched during construction; not cached");
            return Ok(instance);
        }
        let winner = match self.services.entry(key.clone()) {
            MapEntry::Occupied(mut occupied) => match occupied.get().get::<T>() {
                Some(existing) => existing,
                None => {
                    let entry = Entry::new(instance.clone(), ServiceLifetime::Singleton);
                    warn_on_collision(&key, occupied.get().type_name, entry.type_name);
                    occupied.insert(entry);
                    instance
                }
            },
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::new(instance.clone(), ServiceLifetime::Singleton));
                instance
            }
        };
        tracing::debug!(service = %key, "singleton cached");
        Ok(winner)
    }

    pub fn singleton_service<S: ServiceType>(&self) -> Arc<S> {
        self.singleton(S::make_service)
    }

    /// 查找已缓存的实例，从不构造
    ///
    /// 条目缺失或类型不符（短名称冲突）时返回 `None`。
    pub fn lookup<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);
        let key = self.key_for::<T>();

        let found = self.services.get(&key).map(|entry| (entry.get::<T>(), entry.type_name));
        match found {
            Some((Some(instance), _)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(instance)
            }
            Some((None, stored)) => {
                tracing::warn!(
                    service = %key,
                    requested = std::any::type_name::<T>(),
                    stored,
                    "service key holds a different type"
                );
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 解析服务，未注册时返回 `ContainerError::Unregistered`
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.lookup::<T>()
            .ok_or_else(|| ContainerError::unregistered(TypeDescriptor::of::<T>().short_name()))
    }

    /// 组装阶段使用：缺少依赖时立即 panic
    ///
    /// # Panics
    /// Panics with the unregistered-dependency message when `T` is missing.
    pub fn inject<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.resolve::<T>().unwrap_or_else(|err| panic!("{err}"))
    }

    /// 检查 `T` 是否已缓存（且类型一致）
    pub fn is_registered<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
        let key = self.key_for::<T>();
        self.services
            .get(&key)
            .map(|entry| entry.instance.is::<Arc<T>>())
            .unwrap_or(false)
    }

    pub fn lifetime_of<T: ?Sized + 'static>(&self) -> Option<ServiceLifetime> {
        self.services.get(&self.key_for::<T>()).map(|entry| entry.lifetime)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// 已注册服务的键，按名称排序
    pub fn keys(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self.services.iter().map(|e| e.key().clone()).collect();
        keys.sort_by(|a, b| a.name().cmp(b.name()));
        keys
    }

    /// 清空所有条目，环境保持不变
    pub fn clear(&self) {
        self.services.clear();
    }

    /// 获取容器统计信息
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            lookups: self.stats.lookups.load(Ordering::Relaxed),
            cache_hits: self.stats.hits.load(Ordering::Relaxed),
            cache_misses: self.stats.misses.load(Ordering::Relaxed),
            constructions: self.stats.constructions.load(Ordering::Relaxed),
        }
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.environment())?;
        write!(f, "Services:")?;
        let keys = self.keys();
        if keys.is_empty() {
            write!(f, "\n<none>")?;
        }
        for key in keys {
            write!(f, "\n- {key}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("environment", &self.environment())
            .field("services", &self.keys())
            .finish()
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStats {
    pub lookups: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub constructions: usize,
}

impl ContainerStats {
    /// 获取缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    trait Logger: Send + Sync {
        fn prefix(&self) -> &str;
    }

    struct ConsoleLogger {
        prefix: String,
    }

    impl Logger for ConsoleLogger {
        fn prefix(&self) -> &str {
            &self.prefix
        }
    }

    fn console(prefix: &str) -> Arc<dyn Logger> {
        Arc::new(ConsoleLogger {
            prefix: prefix.to_string(),
        })
    }

    #[derive(Debug)]
    struct TestService {
        id: usize,
    }

    #[test]
    fn test_create_does_not_store() {
        let container = ServiceContainer::new();
        let service = container.create(|_| Arc::new(TestService { id: 1 }));
        assert_eq!(service.id, 1);
        assert!(container.lookup::<TestService>().is_none());
        assert!(container.is_empty());
    }

    #[test]
    fn test_register_overwrites() {
        let container = ServiceContainer::new();
        container.register(|_| Arc::new(TestService { id: 1 }));
        let second = container.register(|_| Arc::new(TestService { id: 2 }));

        let resolved = container.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&resolved, &second));
        assert_eq!(container.len(), 1);
        assert_eq!(container.lifetime_of::<TestService>(), Some(ServiceLifetime::Registered));
    }

    #[test]
    fn test_singleton_runs_factory_once() {
        let container = ServiceContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c1 = counter.clone();
        let first = container.singleton(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
            Arc::new(TestService { id: 1 })
        });
        let c2 = counter.clone();
        let second = container.singleton(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
            Arc::new(TestService { id: 2 })
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.id, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(container.lifetime_of::<TestService>(), Some(ServiceLifetime::Singleton));
    }

    #[test]
    fn test_register_then_singleton_reuses_registered_instance() {
        let container = ServiceContainer::new();
        let registered = container.register::<dyn Logger, _>(|_| console("registered"));
        let singleton = container.singleton::<dyn Logger, _>(|_| console("singleton"));

        assert!(Arc::ptr_eq(&registered, &singleton));
        assert_eq!(singleton.prefix(), "registered");
    }

    #[test]
    fn test_resolve_and_lookup_on_missing_service() {
        let container = ServiceContainer::new();
        let err = container.resolve::<dyn Logger>().err().unwrap();
        assert_eq!(err, ContainerError::unregistered("Logger"));
        assert!(err.to_string().contains("Logger"));
        assert!(container.lookup::<dyn Logger>().is_none());
    }

    #[test]
    fn test_unregister_returns_instance() {
        let container = ServiceContainer::new();
        let registered = container.register(|_| Arc::new(TestService { id: 7 }));

        let removed = container.unregister::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&registered, &removed));
        assert!(container.lookup::<TestService>().is_none());
        assert!(container.unregister::<TestService>().is_none());
    }

    #[test]
    fn test_set_environment_clears_everything() {
        let container = ServiceContainer::new();
        container.register(|_| Arc::new(TestService { id: 1 }));
        container.singleton::<dyn Logger, _>(|_| console("x"));
        assert_eq!(container.len(), 2);

        container.set_environment(Environment::Test);
        assert_eq!(container.environment(), Environment::Test);
        assert!(container.lookup::<TestService>().is_none());
        assert!(container.lookup::<dyn Logger>().is_none());
        assert!(container.is_empty());
    }

    #[test]
    fn test_factory_receives_container() {
        let container = ServiceContainer::new();
        container.register::<dyn Logger, _>(|_| console("dep"));

        let service = container.singleton(|c| {
            let logger = c.inject::<dyn Logger>();
            Arc::new(TestService {
                id: logger.prefix().len(),
            })
        });
        assert_eq!(service.id, 3);
    }

    #[test]
    fn test_nested_singleton_inside_factory() {
        let container = ServiceContainer::new();
        let service = container.singleton(|c| {
            let logger = c.singleton::<dyn Logger, _>(|_| console("nested"));
            Arc::new(TestService {
                id: logger.prefix().len(),
            })
        });
        assert_eq!(service.id, 6);
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_failed_factory_stores_nothing() {
        let container = ServiceContainer::new();
        let result = container.try_register::<TestService, String, _>(|_| Err("offline".to_string()));
        assert_eq!(result.unwrap_err(), "offline");
        assert!(!container.is_registered::<TestService>());

        let result = container.try_singleton::<TestService, String, _>(|_| Err("offline".to_string()));
        assert!(result.is_err());
        assert!(container.is_empty());
    }

    #[test]
    #[should_panic(expected = "unregistered dependency: TestService")]
    fn test_inject_panics_when_missing() {
        let container = ServiceContainer::new();
        container.inject::<TestService>();
    }

    #[test]
    fn test_display_lists_environment_and_services() {
        let container = ServiceContainer::with_environment(Environment::Development);
        assert_eq!(container.to_string(), "development\nServices:\n<none>");

        container.register(|_| Arc::new(TestService { id: 1 }));
        container.register::<dyn Logger, _>(|_| console("x"));
        assert_eq!(
            container.to_string(),
            "development\nServices:\n- Logger\n- TestService"
        );
    }

    #[test]
    fn test_clones_share_registrations() {
        let container = ServiceContainer::new();
        let clone = container.clone();
        clone.register(|_| Arc::new(TestService { id: 9 }));
        assert_eq!(container.resolve::<TestService>().unwrap().id, 9);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let container = ServiceContainer::new();
        container.register(|_| Arc::new(TestService { id: 1 }));
        for _ in 0..9 {
            container.lookup::<TestService>();
        }
        container.lookup::<dyn Logger>();

        let stats = container.stats();
        assert_eq!(stats.lookups, 10);
        assert_eq!(stats.cache_hits, 9);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.constructions, 1);
        assert!(stats.hit_rate() > 0.8);
    }
}
