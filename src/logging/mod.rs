use std::str::FromStr;
use std::time::Instant;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;
use crate::errors::AppError;
use crate::infrastructure::container::Environment;

/// 日志格式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读格式
    Pretty,
    /// 紧凑格式
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 环境
    pub environment: Environment,
    /// `EnvFilter` 指令
    pub filter: String,
    /// 输出格式
    pub format: LogFormat,
    /// 是否显示目标模块
    pub show_target: bool,
    /// 是否显示线程名（回调线程与写线程的日志需要区分）
    pub show_thread_names: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Production)
    }
}

impl LoggingConfig {
    /// 根据运行环境选择预设
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self {
                environment,
                filter: "debug".to_string(),
                format: LogFormat::Pretty,
                show_target: true,
                show_thread_names: true,
            },
            Environment::Test => Self {
                environment,
                filter: "error".to_string(),
                format: LogFormat::Compact,
                show_target: false,
                show_thread_names: false,
            },
            Environment::Production | Environment::Staging => Self {
                environment,
                filter: "info".to_string(),
                format: LogFormat::Compact,
                show_target: false,
                show_thread_names: true,
            },
        }
    }

    /// 预设 + 配置文件中的覆盖项
    pub fn from_config(environment: Environment, config: &LogConfig) -> Self {
        Self {
            filter: config.level.clone(),
            format: config.format,
            ..Self::for_environment(environment)
        }
    }
}

/// 初始化日志系统
///
/// `RUST_LOG` 存在时优先于配置中的过滤指令。
pub fn init_logging(config: LoggingConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| AppError::Logging(e.to_string()))?;

    let ansi = config.environment != Environment::Production;
    let result = match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_thread_names(config.show_thread_names)
                .with_ansi(ansi);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_thread_names(config.show_thread_names)
                .with_ansi(ansi);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
    };
    result.map_err(|e| AppError::Logging(e.to_string()))?;

    tracing::info!(
        environment = %config.environment,
        filter = %config.filter,
        format = ?config.format,
        "Logging system initialized"
    );

    Ok(())
}

/// 操作性能计时器
pub struct OperationTimer {
    start: Instant,
    operation: String,
}

impl OperationTimer {
    /// 创建新的计时器
    pub fn new(operation: &str) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.to_string(),
        }
    }

    /// 完成计时并记录日志
    pub fn finish(self) -> std::time::Duration {
        let duration = self.start.elapsed();

        tracing::info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
        duration
    }

    /// 获取当前经过时间
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
