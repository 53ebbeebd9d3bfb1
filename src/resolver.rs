// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # URI 解析模块
//!
//! 把请求中的原始（百分号编码的）路径映射为文档根目录下的文件系统路径。
//!
//! 校验顺序：
//! 1. 拆出查询串与片段，两部分分别百分号解码（UTF-8 失败时退回单字节 Latin-1 解码，解码本身永不失败）；
//! 2. 路径必须以发布前缀和 `/` 开头；
//! 3. 整个目标（含查询串，它会被原样写进重定向地址）不得含有 `<`、`>`、`&`、`"`、NUL；
//! 4. 不得含有 `.` 或 `..` 路径分量；
//! 5. 与文档根目录拼接后规范化，规范路径必须仍在文档根目录之内。
//!
//! 第 5 步是真正的安全边界：前面的字符串检查只负责尽早拒绝明显的恶意请求，
//! 规范化检查则覆盖符号链接等字符串层面看不到的逃逸方式。

use std::{
    io,
    path::{Component, Path, PathBuf, MAIN_SEPARATOR},
};

use log::{debug, warn};
use percent_encoding::percent_decode_str;

use crate::{exception::Exception, param::INSECURE_URI, request::split_target};

/// 通过全部校验的路径，只在解析器到分发器之间短暂存在。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// 文件系统路径；目标存在时为规范化后的绝对路径
    path: PathBuf,
    /// 解码后的服务端相对 URI 路径，用作目录列表标题
    uri_path: String,
}

impl ResolvedPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uri_path(&self) -> &str {
        &self.uri_path
    }

    /// 请求中最后一个路径分量是否为隐藏名（以 `.` 开头）
    pub fn has_hidden_name(&self) -> bool {
        self.uri_path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .map_or(false, |s| s.starts_with('.'))
    }
}

/// 无状态的 URI 解析器，可在所有连接之间共享。
#[derive(Debug, Clone)]
pub struct UriResolver {
    prefix: String,
    root: PathBuf,
}

impl UriResolver {
    /// 以发布前缀和文档根目录构建解析器。文档根目录会被规范化，因此必须存在。
    pub fn new(prefix: &str, root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self {
            prefix: prefix.to_string(),
            root,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 解析原始请求目标（可含查询串与片段）。任何一步失败都会返回对应的 403 类异常。
    pub fn resolve(&self, raw_target: &str, id: u128) -> Result<ResolvedPath, Exception> {
        let (raw_path, raw_tail) = split_target(raw_target);
        let uri = decode_uri(raw_path);

        if !uri.starts_with(&self.prefix) || !uri.starts_with('/') {
            warn!("[ID{}]URI {:?} 不在发布前缀 {:?} 之下", id, uri, self.prefix);
            return Err(Exception::PrefixMismatch);
        }

        if INSECURE_URI.is_match(&uri) || INSECURE_URI.is_match(&decode_uri(raw_tail)) {
            warn!("[ID{}]URI {:?} 含有不安全字符", id, decode_uri(raw_target));
            return Err(Exception::InsecureUri);
        }

        // 按 `/` 与本机路径分隔符同时切分，`\` 在 Windows 上同样视为分隔符
        if uri
            .split(|c| c == '/' || c == MAIN_SEPARATOR)
            .any(|seg| seg == "." || seg == "..")
        {
            warn!("[ID{}]URI {:?} 含有路径遍历分量", id, uri);
            return Err(Exception::PathTraversal);
        }

        let relative = Path::new(uri.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            warn!("[ID{}]URI {:?} 试图覆盖为绝对路径", id, uri);
            return Err(Exception::OutsideRoot);
        }
        let candidate = self.root.join(relative);

        let path = match candidate.canonicalize() {
            Ok(canonical) => {
                if !canonical.starts_with(&self.root) {
                    warn!(
                        "[ID{}]{} 规范化为 {}，逃逸出文档根目录",
                        id,
                        candidate.display(),
                        canonical.display()
                    );
                    return Err(Exception::OutsideRoot);
                }
                canonical
            }
            // 不存在的目标交给分发器回复 404，这里不提前暴露差异
            Err(e) => {
                debug!("[ID{}]无法规范化 {}: {}", id, candidate.display(), e);
                candidate
            }
        };

        debug!("[ID{}]URI {:?} 映射为 {}", id, uri, path.display());
        Ok(ResolvedPath {
            path,
            uri_path: uri,
        })
    }
}

/// 百分号解码。结果不是合法 UTF-8 时，按每字节一个字符（Latin-1）解码。
pub fn decode_uri(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(s) => s.into_owned(),
        Err(_) => percent_decode_str(raw).map(char::from).collect(),
    }
}
