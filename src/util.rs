use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use log::debug;

use crate::{entry::FileEntry, param::ALLOWED_FILE_NAME};

/// 目录列表中的一行
#[derive(Debug, Clone)]
pub struct ListingEntry {
    name: String,
    is_dir: bool,
    len: u64,
    modified: Option<DateTime<Local>>,
}

impl ListingEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}

/// 读取目录，只保留非隐藏、可读且文件名匹配白名单的条目。
///
/// 不匹配白名单的名字可能破坏生成的 HTML 或编码路径把戏，因此不会被渲染为链接。
pub fn collect_listing(dir: &Path, id: u128) -> std::io::Result<Vec<ListingEntry>> {
    let mut paths = Vec::<PathBuf>::new();
    for entry in fs::read_dir(dir)? {
        paths.push(entry?.path());
    }

    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        let probe = FileEntry::probe(&path);
        if probe.is_hidden() || !probe.is_readable() || !ALLOWED_FILE_NAME.is_match(&name) {
            debug!("[ID{}]目录列表跳过条目：{:?}", id, name);
            continue;
        }
        entries.push(ListingEntry {
            name,
            is_dir: probe.is_dir(),
            len: probe.len(),
            modified: probe.modified().map(DateTime::<Local>::from),
        });
    }
    sort_listing(&mut entries);
    Ok(entries)
}

/// 目录在前，其余按名称排序
fn sort_listing(entries: &mut [ListingEntry]) {
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
}

pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    /// `uri_path` 为目录的服务端相对路径（以 `/` 结尾）。
    pub fn from_dir(uri_path: &str, entries: &[ListingEntry]) -> Self {
        let title = escape_html(uri_path);
        let mut body = String::new();
        body.push_str(&format!("<h1>{} 目录：</h1><hr>\r\n", title));
        body.push_str("<table>\r\n");
        body.push_str("<tr><td>文件名</td><td>大小</td><td>修改时间</td></tr>\r\n");
        body.push_str("<tr><td><a href=\"../\">..</a></td><td></td><td></td></tr>\r\n");
        for entry in entries {
            let modified = entry
                .modified
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            // 名字已通过白名单，无需转义
            let (href, size) = match entry.is_dir {
                true => (format!("{}/", entry.name), "文件夹".to_string()),
                false => (entry.name.clone(), format_file_size(entry.len)),
            };
            body.push_str(&format!(
                "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>\r\n",
                href, href, size, modified
            ));
        }
        body.push_str("</table>\r\n");
        let css = r"
            table {
                border-collapse: collapse;
            }
            td {
                padding: 4px 16px 4px 0;
            }"
        .to_string();
        HtmlBuilder {
            title: format!("{} 目录：", title),
            css,
            body,
        }
    }

    pub fn build(&self) -> String {
        format!(
            "<!DOCTYPE html>\r\n<html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head><body>\r\n{}</body></html>\r\n",
            self.title, self.css, self.body
        )
    }
}

/// 转义文本节点与属性值中的 HTML 特殊字符。
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(entries: &[ListingEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_file_size() {
        assert_eq!(format_file_size(0), "0.0 B");
        assert_eq!(format_file_size(1023), "1023.0 B");
        assert_eq!(format_file_size(9926), "9.7 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
        assert_eq!(format_file_size(1099511627776), "1.0 TB");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("/file/it's"), "/file/it&#39;s");
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_collect_listing_filters() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join(".hidden"), b"h").unwrap();
        fs::write(dir.path().join("with space.txt"), b"s").unwrap();
        fs::write(dir.path().join("-leading-dash"), b"d").unwrap();
        fs::create_dir(dir.path().join("zdir")).unwrap();

        let entries = collect_listing(dir.path(), 0).unwrap();
        assert_eq!(names(&entries), vec!["zdir", "a.txt", "b.txt"]);
        assert!(entries[0].is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_listing_skips_unreadable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked.txt");
        fs::write(&locked, b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        fs::write(dir.path().join("open.txt"), b"x").unwrap();

        let entries = collect_listing(dir.path(), 0).unwrap();
        assert_eq!(names(&entries), vec!["open.txt"]);
    }

    #[test]
    fn test_collect_listing_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(collect_listing(&dir.path().join("gone"), 0).is_err());
    }

    #[test]
    fn test_html_from_empty_dir() {
        let html = HtmlBuilder::from_dir("/file/sub/", &[]).build();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>/file/sub/ 目录：</title>"));
        assert!(html.contains("<a href=\"../\">..</a>"));
        assert_eq!(html.matches("<a href=").count(), 1);
    }

    #[test]
    fn test_html_links() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.txt"), b"0123456789").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        let entries = collect_listing(dir.path(), 0).unwrap();

        let html = HtmlBuilder::from_dir("/file/", &entries).build();
        assert!(html.contains("<a href=\"readme.txt\">readme.txt</a>"));
        assert!(html.contains("<a href=\"docs/\">docs/</a>"));
        assert!(html.contains("10.0 B"));
        assert_eq!(html.matches("<a href=").count(), 3);
    }
}
