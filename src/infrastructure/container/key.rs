//! 服务键的生成策略
//!
//! 默认策略按类型的短名称（去掉模块路径）生成键：两个短名称相同的不同类型会
//! 落到同一个键上并互相覆盖。需要区分这类类型时改用 [`TypeIdKey`]。

use std::any::TypeId;
use std::fmt;

/// 被注册类型的描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name as reported by the compiler.
    pub fn full_name(&self) -> &'static str {
        self.name
    }

    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }
}

/// 服务键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKey {
    Name(String),
    Id(TypeId, String),
}

impl ServiceKey {
    pub fn name(&self) -> &str {
        match self {
            ServiceKey::Name(name) | ServiceKey::Id(_, name) => name,
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 从类型描述生成服务键
pub trait KeyStrategy: Send + Sync {
    fn key(&self, ty: &TypeDescriptor) -> ServiceKey;
}

/// 按短类型名生成键（默认）
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeNameKey;

impl KeyStrategy for TypeNameKey {
    fn key(&self, ty: &TypeDescriptor) -> ServiceKey {
        ServiceKey::Name(ty.short_name())
    }
}

/// 按 `TypeId` 生成键，不会发生名称冲突
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeIdKey;

impl KeyStrategy for TypeIdKey {
    fn key(&self, ty: &TypeDescriptor) -> ServiceKey {
        ServiceKey::Id(ty.id(), ty.short_name())
    }
}

/// Strip module paths from every path segment of a type name.
///
/// `app::log::Logger` becomes `Logger`, and
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
/// Trait objects are named after the trait: `dyn app::Logger` becomes `Logger`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ' ' && &out[segment_start..] == "dyn" {
            out.truncate(segment_start);
            continue;
        }
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
            continue;
        }
        out.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = out.len();
        }
    }
    out
}
