use crate::normalize::normalize;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// 触发词 → 值（应用路径或回复文本）
pub type Table = BTreeMap<String, String>;

/// 规则表标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    /// 应用名 → 启动路径
    Applications,
    /// 触发短语 → 回复文本
    Responses,
}

impl TableId {
    pub fn name(self) -> &'static str {
        match self {
            TableId::Applications => "applications",
            TableId::Responses => "responses",
        }
    }
}

/// 加载时遇到的可恢复问题，表按空表处理
#[derive(Debug, Error)]
pub enum StoreIssue {
    #[error("规则表不存在: {}", .0.display())]
    Absent(PathBuf),
    #[error("规则表格式错误 {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("读取规则表失败 {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("触发词为空")]
    EmptyKey,
    #[error("写入规则表失败 {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("序列化规则表失败: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("替换规则表失败 {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 一次加载的结果
#[derive(Debug, Default)]
pub struct Loaded {
    pub entries: Table,
    pub issue: Option<StoreIssue>,
}

/// 持久化的应用表与回复表
pub struct RuleStore {
    applications_path: PathBuf,
    responses_path: PathBuf,
    applications: Table,
    responses: Table,
}

impl RuleStore {
    /// 打开两张表；文件缺失或损坏只记日志，按空表继续
    pub fn open(applications_path: impl Into<PathBuf>, responses_path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            applications_path: applications_path.into(),
            responses_path: responses_path.into(),
            applications: Table::new(),
            responses: Table::new(),
        };
        store.reload();
        store
    }

    pub fn path(&self, table: TableId) -> &Path {
        match table {
            TableId::Applications => &self.applications_path,
            TableId::Responses => &self.responses_path,
        }
    }

    /// 从磁盘读取一张表（不影响内存中的副本）
    pub fn load(&self, table: TableId) -> Loaded {
        read_table(self.path(table))
    }

    /// 重新读取两张表
    pub fn reload(&mut self) {
        for table in [TableId::Applications, TableId::Responses] {
            let loaded = self.load(table);
            if let Some(issue) = &loaded.issue {
                log::warn!("{} 表按空表处理: {issue}", table.name());
            }
            *self.table_mut(table) = loaded.entries;
        }
    }

    /// 规范化后精确匹配
    pub fn get(&self, table: TableId, key: &str) -> Option<&str> {
        self.entries(table).get(&normalize(key)).map(String::as_str)
    }

    pub fn entries(&self, table: TableId) -> &Table {
        match table {
            TableId::Applications => &self.applications,
            TableId::Responses => &self.responses,
        }
    }

    /// 插入或覆盖一条规则并整表落盘；失败时内存与磁盘均保持原样
    pub fn upsert(&mut self, table: TableId, key: &str, value: &str) -> Result<(), StoreError> {
        let key = normalize(key);
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let mut updated = self.entries(table).clone();
        updated.insert(key.clone(), value.to_string());
        write_table(self.path(table), &updated)?;
        *self.table_mut(table) = updated;
        log::info!("{} 表已更新: {key}", table.name());
        Ok(())
    }

    fn table_mut(&mut self, table: TableId) -> &mut Table {
        match table {
            TableId::Applications => &mut self.applications,
            TableId::Responses => &mut self.responses,
        }
    }
}

/// 读取 JSON 表并规范化所有键
pub fn read_table(path: &Path) -> Loaded {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Loaded {
                entries: Table::new(),
                issue: Some(StoreIssue::Absent(path.to_path_buf())),
            };
        }
        Err(e) => {
            return Loaded {
                entries: Table::new(),
                issue: Some(StoreIssue::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }),
            };
        }
    };

    let raw: Table = match serde_json::from_slice(&bytes) {
        Ok(raw) => raw,
        Err(e) => {
            return Loaded {
                entries: Table::new(),
                issue: Some(StoreIssue::Corrupt {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }),
            };
        }
    };

    let mut entries = Table::new();
    for (key, value) in raw {
        let key = normalize(&key);
        if entries.insert(key.clone(), value).is_some() {
            log::warn!("{} 中触发词 {key:?} 规范化后重复，保留后者", path.display());
        }
    }
    Loaded { entries, issue: None }
}

/// 原子写入：先写同目录临时文件，再替换目标文件
pub fn write_table(path: &Path, table: &Table) -> Result<(), StoreError> {
    stage_table(path, table)?.commit()
}

/// 已写入临时文件、尚未替换目标的表
pub struct StagedTable {
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedTable {
    pub fn commit(self) -> Result<(), StoreError> {
        let target = self.target;
        self.file.persist(&target).map_err(|e| StoreError::Persist {
            path: target.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}

pub fn stage_table(path: &Path, table: &Table) -> Result<StagedTable, StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
        path: dir.clone(),
        source,
    })?;

    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    table.serialize(&mut serializer)?;
    buf.push(b'\n');

    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tempfile::Builder::new()
        .prefix(".rules-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(io_err)?;
    file.write_all(&buf).map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;

    Ok(StagedTable {
        file,
        target: path.to_path_buf(),
    })
}
