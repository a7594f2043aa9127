//! 证书打包模块
//!
//! 将证书文件打包为 gzip 压缩的 tar 归档，供传输到目标服务器后解压。
//! 支持两种模式：按文件清单打包（主模式）和整目录打包（支持排除模式）。

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ArchiveError;

/// 归档条目
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// 磁盘上的源路径
    pub source: PathBuf,
    /// tar 包内使用的名称 (未指定时取源文件名)
    pub name: Option<String>,
}

impl ArchiveEntry {
    /// 解析包内名称
    fn archive_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.source.to_string_lossy().into_owned()),
        }
    }
}

/// 打包结果
///
/// 构建完成后只读；部署循环的所有目标共享同一个归档文件。
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    /// 归档文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 归档文件名 (远端暂存时使用)
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// 构建时的条目清单
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }
}

/// 证书打包器
///
/// 逐条目校验存在性、记录元数据 (权限位、大小、类型) 并写入内容，
/// 目录条目只写元数据记录。出错时输出文件可能已部分写入，
/// 调用方应将其视为无效文件。
pub struct ArchiveBuilder {
    entries: Vec<ArchiveEntry>,
}

impl ArchiveBuilder {
    /// 创建空的打包器
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 添加一个条目，`name` 为空时使用源文件名
    pub fn entry(mut self, source: impl Into<PathBuf>, name: Option<String>) -> Self {
        self.entries.push(ArchiveEntry {
            source: source.into(),
            name,
        });
        self
    }

    /// 打包为 gzip tar 归档并写入 `output`
    pub fn build(self, output: &Path) -> Result<Archive, ArchiveError> {
        let out = File::create(output)?;
        let encoder = GzEncoder::new(out, Compression::default());
        let mut tar = tar::Builder::new(encoder);

        for entry in &self.entries {
            append_entry(&mut tar, &entry.source, &entry.archive_name())?;
        }

        let encoder = tar.into_inner()?;
        encoder.finish()?;

        debug!("打包完成: {} ({} 个条目)", output.display(), self.entries.len());
        Ok(Archive {
            path: output.to_path_buf(),
            entries: self.entries,
        })
    }
}

/// 整目录打包
///
/// 所有条目以相对 `source_dir` 的路径命名。排除模式按 glob 语法匹配
/// 相对路径，`*` 不跨越路径分隔符；匹配到目录时整个子树都被排除，
/// 以 `/` 结尾的模式同时匹配该目录下的直接子项。
pub fn pack_dir(
    output: &Path,
    source_dir: &Path,
    excludes: &[String],
) -> Result<Archive, ArchiveError> {
    match fs::metadata(source_dir) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ArchiveError::NotFound(source_dir.to_path_buf()))
        }
        Err(e) => return Err(ArchiveError::Io(e)),
    }

    let patterns = compile_patterns(excludes);

    let out = File::create(output)?;
    let encoder = GzEncoder::new(out, Compression::default());
    let mut tar = tar::Builder::new(encoder);
    let mut entries = Vec::new();

    let root = source_dir.to_path_buf();
    let walker = WalkDir::new(source_dir).into_iter().filter_entry(|e| {
        let rel = match e.path().strip_prefix(&root) {
            Ok(rel) => rel,
            Err(_) => return true,
        };
        // 根目录自身不参与排除匹配
        if rel.as_os_str().is_empty() {
            return true;
        }
        if is_excluded(rel, &patterns) {
            debug!("排除: {}", rel.display());
            return false;
        }
        true
    });

    for entry in walker {
        let entry = entry.map_err(|e| ArchiveError::Io(e.into()))?;
        let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
        if rel.as_os_str().is_empty() {
            continue;
        }

        let name = rel.to_string_lossy().into_owned();
        append_entry(&mut tar, entry.path(), &name)?;
        entries.push(ArchiveEntry {
            source: entry.path().to_path_buf(),
            name: Some(name),
        });
    }

    let encoder = tar.into_inner()?;
    encoder.finish()?;

    debug!("目录打包完成: {} ({} 个条目)", output.display(), entries.len());
    Ok(Archive {
        path: output.to_path_buf(),
        entries,
    })
}

/// 写入单个条目: 元数据记录 + 文件内容
fn append_entry<W: io::Write>(
    tar: &mut tar::Builder<W>,
    source: &Path,
    name: &str,
) -> Result<(), ArchiveError> {
    let meta = match fs::metadata(source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ArchiveError::NotFound(source.to_path_buf()))
        }
        Err(e) => return Err(ArchiveError::Io(e)),
    };

    let mut header = tar::Header::new_gnu();
    header.set_metadata(&meta);

    if meta.is_dir() {
        let name = format!("{}/", name.trim_end_matches('/'));
        tar.append_data(&mut header, &name, io::empty())?;
        debug!("添加目录: {} -> {}", source.display(), name);
    } else {
        let file = File::open(source)?;
        tar.append_data(&mut header, name, file)?;
        debug!("添加文件: {} -> {}", source.display(), name);
    }

    Ok(())
}

/// 编译排除模式，无效模式告警后忽略
fn compile_patterns(excludes: &[String]) -> Vec<glob::Pattern> {
    let mut patterns = Vec::new();
    for raw in excludes {
        if raw.is_empty() {
            continue;
        }
        match glob::Pattern::new(raw) {
            Ok(p) => patterns.push(p),
            Err(e) => warn!("忽略无效的排除模式 {}: {}", raw, e),
        }
        // "conf/" 形式的模式追加一条匹配目录内容的变体
        if let Some(dir) = raw.strip_suffix('/') {
            if let Ok(p) = glob::Pattern::new(&format!("{}/*", dir)) {
                patterns.push(p);
            }
        }
    }
    patterns
}

fn is_excluded(rel: &Path, patterns: &[glob::Pattern]) -> bool {
    // `*` 只在单层路径内匹配，不跨越 `/`
    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let rel = rel.to_string_lossy();
    patterns.iter().any(|p| p.matches_with(&rel, options))
}
