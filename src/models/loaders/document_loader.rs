use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, FileError};
use crate::models::document::Document;

/// 课程页面的文件名
const LESSON_FILE_NAME: &str = "index.html";

/// 按目录约定 `unit-*/lesson-*/index.html` 查找所有课程页面
///
/// # 返回
/// 排好序的路径列表，保证每次运行的处理顺序一致
pub fn discover_lessons(root: &Path) -> AppResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: root.display().to_string(),
        }));
    }

    let mut lessons = Vec::new();
    for unit_dir in sorted_subdirs(root, "unit-")? {
        for lesson_dir in sorted_subdirs(&unit_dir, "lesson-")? {
            let html = lesson_dir.join(LESSON_FILE_NAME);
            if html.is_file() {
                debug!("发现课程: {}", html.display());
                lessons.push(html);
            } else {
                warn!("⚠️ 课程目录缺少 {}: {}", LESSON_FILE_NAME, lesson_dir.display());
            }
        }
    }

    info!("✓ 在 {} 下找到 {} 个课程页面", root.display(), lessons.len());
    Ok(lessons)
}

/// 列出以指定前缀开头的子目录（排序）
fn sorted_subdirs(dir: &Path, prefix: &str) -> AppResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| AppError::read_failed(dir, e))?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    dirs.sort_by_cached_key(|path| {
        natural_key(&path.file_name().unwrap_or_default().to_string_lossy())
    });
    Ok(dirs)
}

/// 自然排序的片段：数字按数值比较
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NameChunk {
    Number(u64),
    Text(String),
}

/// `unit-10-cells` → [Text("unit-"), Number(10), Text("-cells")]，使 unit-2 排在 unit-10 之前
fn natural_key(name: &str) -> Vec<NameChunk> {
    let mut chunks = Vec::new();
    let mut rest = name;
    while let Some(first) = rest.chars().next() {
        let is_digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        chunks.push(match head.parse::<u64>() {
            Ok(n) if is_digit => NameChunk::Number(n),
            _ => NameChunk::Text(head.to_string()),
        });
        rest = tail;
    }
    chunks
}

/// 计算文档标识
///
/// 取相对于根目录的路径并去掉文件名：
/// `root/unit-1-cells/lesson-1-1/index.html` → `unit-1-cells/lesson-1-1`。
/// 不在根目录下的文件退化为完整路径。
pub fn document_id_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let without_file = if relative.file_name().and_then(|n| n.to_str()) == Some(LESSON_FILE_NAME)
    {
        relative.parent().unwrap_or(relative)
    } else {
        relative
    };

    let id = without_file
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");

    if id.is_empty() {
        path.display().to_string()
    } else {
        id
    }
}

/// 读取单个课程页面
pub fn load_document(root: &Path, path: &Path) -> AppResult<Document> {
    let raw_text = fs::read_to_string(path).map_err(|e| AppError::read_failed(path, e))?;
    let id = document_id_for(root, path);
    debug!("已读取 {} ({} 字节)", id, raw_text.len());
    Ok(Document::new(path, id, raw_text))
}
