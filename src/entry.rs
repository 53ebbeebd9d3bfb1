// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 按需探测的文件系统元数据。每个请求重新读取，从不缓存。

use std::{fs, path::Path, time::SystemTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    exists: bool,
    hidden: bool,
    is_dir: bool,
    is_file: bool,
    len: u64,
    readable: bool,
    modified: Option<SystemTime>,
}

impl FileEntry {
    /// 探测 `path`。符号链接会被跟随；悬空链接视为不存在。
    pub fn probe(path: &Path) -> Self {
        let hidden = is_hidden_name(path);
        match fs::metadata(path) {
            Ok(meta) => Self {
                exists: true,
                hidden,
                is_dir: meta.is_dir(),
                is_file: meta.is_file(),
                len: meta.len(),
                readable: is_readable(&meta),
                modified: meta.modified().ok(),
            },
            Err(_) => Self {
                exists: false,
                hidden,
                is_dir: false,
                is_file: false,
                len: 0,
                readable: false,
                modified: None,
            },
        }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_file(&self) -> bool {
        self.is_file
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// Unix 语义：文件名以 `.` 开头即为隐藏。
fn is_hidden_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

#[cfg(unix)]
fn is_readable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o444 != 0
}

#[cfg(not(unix))]
fn is_readable(_meta: &fs::Metadata) -> bool {
    true
}
