use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, info, warn};
use std::{fs, io::ErrorKind, path::PathBuf};

use crate::param::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_HEAD_SIZE, DEFAULT_PORT, DEFAULT_PREFIX};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_prefix")]
    prefix: String,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_max_head_size")]
    max_head_size: usize,
}

fn default_www_root() -> String {
    ".".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_local() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_head_size() -> usize {
    DEFAULT_MAX_HEAD_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: default_www_root(),
            port: default_port(),
            prefix: default_prefix(),
            worker_threads: 0,
            local: default_local(),
            chunk_size: default_chunk_size(),
            max_head_size: default_max_head_size(),
        }
    }

    /// 从 TOML 文件载入配置。文件不存在或无法解析时使用默认配置。
    pub fn from_toml(filename: &str) -> Self {
        let str_val = match fs::read_to_string(filename) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("配置文件{}不存在，使用默认配置", filename);
                return Self::new().normalized();
            }
            Err(e) => {
                error!("无法读取配置文件{}：{}，使用默认配置", filename, e);
                return Self::new().normalized();
            }
        };
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(s: &str) -> Self {
        let raw_config: Config = match toml::from_str(s) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象（{}），使用默认配置", e);
                Config::new()
            }
        };
        raw_config.normalized()
    }

    /// 应用命令行参数：`[port] [prefix]`。非法端口只记录警告并保留原值。
    pub fn apply_args<S: AsRef<str>>(mut self, args: &[S]) -> Self {
        if let Some(port) = args.first() {
            match port.as_ref().parse::<u16>() {
                Ok(p) => self.port = p,
                Err(e) => warn!("无法解析端口参数{:?}：{}，沿用{}", port.as_ref(), e, self.port),
            }
        }
        if let Some(prefix) = args.get(1) {
            self.prefix = prefix.as_ref().to_string();
        }
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.chunk_size == 0 {
            warn!("chunk_size被设置为0，将改为默认值{}", DEFAULT_CHUNK_SIZE);
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        if self.max_head_size == 0 {
            warn!("max_head_size被设置为0，将改为默认值{}", DEFAULT_MAX_HEAD_SIZE);
            self.max_head_size = DEFAULT_MAX_HEAD_SIZE;
        }
        if !self.prefix.starts_with('/') {
            warn!("前缀{:?}不以/开头，已自动补全", self.prefix);
            self.prefix.insert(0, '/');
        }
        self
    }

    pub fn with_www_root(mut self, root: impl Into<String>) -> Self {
        self.www_root = root.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.normalized()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self.normalized()
    }
}

impl Config {
    pub fn www_root(&self) -> PathBuf {
        PathBuf::from(&self.www_root)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_head_size(&self) -> usize {
        self.max_head_size
    }
}
