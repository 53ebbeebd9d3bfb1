// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 响应分发模块
//!
//! 对每个请求恰好产生一个终结响应：错误、重定向、目录列表或文件流。
//!
//! ## 决策顺序
//! 1. 请求无法解码 → 400
//! 2. 非 GET → 405
//! 3. 解析器拒绝 → 403
//! 4. 隐藏或不存在 → 404
//! 5. 目录：URI 以 `/` 结尾则列出内容，否则 302 到补上 `/` 的地址
//! 6. 既非目录也非普通文件 → 403
//! 7. 普通文件：打开失败 → 404，否则流式发送
//!
//! 除文件流外，所有响应发送后都关闭连接。

use std::{fs::File, io, path::Path};

use log::{debug, error, warn};

use crate::{
    config::Config,
    entry::FileEntry,
    exception::Exception,
    param::{mime_for, HttpRequestMethod},
    request::Request,
    resolver::{ResolvedPath, UriResolver},
    response::Response,
    stream::FileStream,
    util::{collect_listing, HtmlBuilder},
};

/// 无状态的分发器。所有连接共享同一个实例，不持有任何跨请求的可变状态。
#[derive(Debug, Clone)]
pub struct Dispatcher {
    resolver: UriResolver,
    chunk_size: usize,
}

impl Dispatcher {
    pub fn new(resolver: UriResolver, chunk_size: usize) -> Self {
        Self {
            resolver,
            chunk_size,
        }
    }

    pub fn from_config(config: &Config) -> io::Result<Self> {
        let resolver = UriResolver::new(config.prefix(), config.www_root())?;
        Ok(Self::new(resolver, config.chunk_size()))
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// 为请求产生唯一的终结响应。
    pub fn dispatch(&self, request: &Request, id: u128) -> Response {
        match self.try_dispatch(request, id) {
            Ok(response) => response,
            Err(e) => {
                if e.is_policy_violation() {
                    warn!("[ID{}]拒绝访问 {:?}: {}", id, request.uri(), e);
                } else if e.status_code() == 500 {
                    error!("[ID{}]处理请求时发生内部错误: {}", id, e);
                } else {
                    debug!("[ID{}]请求 {:?} 失败: {}", id, request.uri(), e);
                }
                Response::error(e.status_code())
            }
        }
    }

    fn try_dispatch(&self, request: &Request, id: u128) -> Result<Response, Exception> {
        if !request.is_decoded() {
            return Err(Exception::BadRequest);
        }
        if request.method() != &HttpRequestMethod::Get {
            return Err(Exception::MethodNotAllowed);
        }

        let resolved = self.resolver.resolve(request.uri(), id)?;
        let entry = FileEntry::probe(resolved.path());
        if !entry.exists() || entry.is_hidden() || resolved.has_hidden_name() {
            return Err(Exception::FileNotFound);
        }

        if entry.is_dir() {
            if request.path().ends_with('/') {
                return self.listing(&resolved, id);
            }
            let location = redirect_location(request);
            debug!("[ID{}]目录URI缺少尾斜杠，重定向到 {}", id, location);
            return Ok(Response::redirect(&location));
        }

        if !entry.is_file() {
            return Err(Exception::NotRegularFile);
        }

        // 探测与打开之间文件可能已被删除
        let file = File::open(resolved.path()).map_err(|e| {
            debug!("[ID{}]无法打开 {}: {}", id, resolved.path().display(), e);
            Exception::FileNotFound
        })?;
        let length = file.metadata()?.len();
        let mime = mime_for(resolved.path());
        debug!(
            "[ID{}]流式发送 {}，{} 字节，类型 {}",
            id,
            resolved.path().display(),
            length,
            mime
        );

        let stream = FileStream::new(file, 0, length, self.chunk_size);
        Ok(Response::file(stream, mime, request.is_keep_alive()))
    }

    fn listing(&self, resolved: &ResolvedPath, id: u128) -> Result<Response, Exception> {
        let entries = collect_listing(resolved.path(), id)?;
        debug!(
            "[ID{}]目录 {} 共列出 {} 个条目",
            id,
            resolved.uri_path(),
            entries.len()
        );
        let html = HtmlBuilder::from_dir(resolved.uri_path(), &entries).build();
        Ok(Response::listing(html))
    }
}

/// 原始路径恰好补上一个 `/`，查询串原样保留。
fn redirect_location(request: &Request) -> String {
    match request.query() {
        Some(q) => format!("{}/?{}", request.path(), q),
        None => format!("{}/", request.path()),
    }
}
