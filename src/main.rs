mod args;

use clap::Parser;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use synckit::collections::{SequenceOptions, SynchronizedVec};
use synckit::config::AppConfig;
use synckit::errors::{AppError, ConfigError};
use synckit::infrastructure::composition;
use synckit::infrastructure::{register_modules, Environment, ServiceContainer, ServiceModule, ServiceType};
use synckit::logging::{init_logging, LoggingConfig, OperationTimer};

use args::{Args, Command};

fn main() -> Result<(), AppError> {
    let args = Args::parse();

    let config = match args.config.clone() {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    init_logging(LoggingConfig::from_config(config.service.environment, &config.logging))?;

    match args.command {
        Command::Sequence { threads, items } => run_sequence(&config, threads, items),
        Command::Services { environment } => run_services(&config, environment.as_deref()),
    }
}

fn run_sequence(config: &AppConfig, threads: usize, items: usize) -> Result<(), AppError> {
    let options = SequenceOptions::from_config(&config.collections)?;
    let sequence = Arc::new(SynchronizedVec::try_with_options(Vec::new(), options)?);
    let timer = OperationTimer::new("sequence.append");

    let writers: Vec<_> = (0..threads)
        .map(|worker| {
            let sequence = sequence.clone();
            thread::spawn(move || {
                for i in 0..items {
                    sequence.append(worker * items + i);
                }
            })
        })
        .collect();
    for writer in writers {
        writer
            .join()
            .map_err(|_| AppError::Generic("writer thread panicked".to_string()))?;
    }
    sequence.flush();
    let elapsed = timer.finish();

    let expected = threads * items;
    let count = sequence.count();
    println!("appended {count}/{expected} elements in {elapsed:?}");

    let (tx, rx) = mpsc::channel();
    sequence.remove_where(
        |value| value % 2 == 0,
        Some(Box::new(move |removed: Vec<usize>| {
            let _ = tx.send(removed.len());
        })),
    );
    let removed = rx
        .recv_timeout(Duration::from_secs(10))
        .map_err(|e| AppError::Generic(format!("completion callback not delivered: {e}")))?;
    println!("removed {removed} even elements, {} remain", sequence.count());

    if count != expected {
        return Err(AppError::Generic(format!(
            "expected {expected} elements, found {count}"
        )));
    }
    Ok(())
}

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct ConsoleGreeter {
    environment: Environment,
}

impl Greeter for ConsoleGreeter {
    fn greet(&self, name: &str) -> String {
        format!("[{}] hello, {name}", self.environment)
    }
}

struct Clock {
    frozen: bool,
}

impl ServiceType for Clock {
    fn make_service(container: &ServiceContainer) -> Arc<Self> {
        Arc::new(Clock {
            frozen: container.environment() == Environment::Test,
        })
    }
}

struct CoreModule;

impl ServiceModule for CoreModule {
    fn name(&self) -> &str {
        "core"
    }

    fn register(&self, container: &ServiceContainer) {
        container.singleton_service::<Clock>();
        container.singleton::<dyn Greeter, _>(|c| {
            Arc::new(ConsoleGreeter {
                environment: c.environment(),
            })
        });
    }
}

fn run_services(config: &AppConfig, environment: Option<&str>) -> Result<(), AppError> {
    let container = ServiceContainer::from_config(&config.service);
    if let Some(raw) = environment {
        let environment = raw.parse::<Environment>().map_err(|_| ConfigError::InvalidValue {
            field: "--environment".to_string(),
            value: raw.to_string(),
        })?;
        container.set_environment(environment);
    }

    let modules: Vec<Box<dyn ServiceModule>> = vec![Box::new(CoreModule)];
    register_modules(&container, &modules);
    composition::install(container.clone());

    let greeter = composition::inject::<dyn Greeter>();
    let clock = container.resolve::<Clock>()?;
    println!("{}", greeter.greet("synckit"));
    println!("clock frozen: {}", clock.frozen);
    println!("{container}");

    match container.resolve::<String>() {
        Ok(value) => println!("unexpected String service: {value}"),
        Err(err) => println!("{err}"),
    }
    Ok(())
}
