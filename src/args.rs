use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// synckit - 线程安全序列与服务容器演示
#[derive(Parser, Debug)]
#[command(name = "synckit")]
#[command(about = "Thread-safe sequence container and service registry demo")]
pub struct Args {
    /// 子命令
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径（默认为用户配置目录下的 synckit/config.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 多线程并发写入一个序列并校验结果
    Sequence {
        /// 写入线程数
        #[arg(long, default_value_t = 4)]
        threads: usize,
        /// 每个线程写入的元素数
        #[arg(long, default_value_t = 250)]
        items: usize,
    },
    /// 按环境组装服务并打印容器内容
    Services {
        /// 覆盖配置中的环境
        #[arg(long)]
        environment: Option<String>,
    },
}
