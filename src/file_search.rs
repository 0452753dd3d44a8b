use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 可搜索的文件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Video,
    Audio,
    Document,
    Image,
}

impl FileKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileKind::Video => &[".mp4", ".mkv", ".avi", ".mov"],
            FileKind::Audio => &[".mp3", ".wav", ".aac"],
            FileKind::Document => &[".pdf", ".docx", ".txt", ".pptx", ".xlsx"],
            FileKind::Image => &[".jpg", ".jpeg", ".png", ".bmp", ".webp"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Document => "document",
            FileKind::Image => "image",
        }
    }

    /// 追问时的说法
    pub fn noun(self) -> &'static str {
        match self {
            FileKind::Video => "video file",
            FileKind::Audio => "audio file",
            FileKind::Document => "document",
            FileKind::Image => "image file",
        }
    }
}

/// 文件名扩展名属于该类别，且包含查询词（不区分大小写）
pub fn matches(file_name: &str, query: &str, kind: FileKind) -> bool {
    let name = file_name.to_lowercase();
    kind.extensions().iter().any(|ext| name.ends_with(ext)) && name.contains(&query.to_lowercase())
}

/// 从 root 递归搜索；无法读取的目录直接跳过
pub fn search(root: &Path, query: &str, kind: FileKind) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("跳过不可读路径: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| matches(&entry.file_name().to_string_lossy(), query, kind))
        .map(|entry| entry.into_path())
        .collect()
}
