// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 静态文件服务器
//!
//! 把一个本地目录以 HTTP/1.1 的方式只读发布出去：
//! - 只服务指定前缀下的 GET 请求；
//! - 对目录输出 HTML 列表，对文件按块流式发送；
//! - 拒绝任何指向根目录之外的路径。
//!
//! 用法：`fileserver [port] [prefix]`，命令行参数覆盖配置文件中的同名项。

use std::{env, path::Path, process};

use fileserver::{Config, Server};
use log::{error, info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};
use tokio::runtime::Builder;

const LOG_CONFIG: &str = "config/log4rs.yaml";
const SERVER_CONFIG: &str = "config/fileserver.toml";

fn main() {
    // 1. 日志：优先使用外部 YAML 配置，缺失或无效时退回到控制台输出
    init_logging();

    // 2. 配置：TOML 文件 + 命令行参数
    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::from_toml(SERVER_CONFIG).apply_args(&args);
    info!("配置文件已载入");

    // 3. 运行时：按配置分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            process::exit(1);
        }
    };

    runtime.block_on(async {
        let server = match Server::bind(&config).await {
            Ok(s) => s,
            Err(e) => {
                error!("无法在端口{}上启动服务：{}", config.port(), e);
                process::exit(1);
            }
        };
        server.run().await;
    });
    info!("服务端已停止");
}

fn init_logging() {
    if Path::new(LOG_CONFIG).exists() {
        match log4rs::init_file(LOG_CONFIG, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("无法载入日志配置{}：{}，改用控制台日志", LOG_CONFIG, e),
        }
    }
    if let Err(e) = console_logging() {
        eprintln!("无法初始化日志系统：{}", e);
    }
}

fn console_logging() -> Result<(), Box<dyn std::error::Error>> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}",
        )))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}
