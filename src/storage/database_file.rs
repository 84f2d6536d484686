//! GeoIP 数据库文件存储
//!
//! 管理唯一的本地数据库文件，并保证替换是原子的：
//! 新内容先写入同目录下的临时文件，再通过一次 rename 覆盖正式路径。
//! 读者在任何时刻看到的都是完整的旧文件或完整的新文件。

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::errors::Result;

/// 数据库文件元信息（不包含路径，可直接返回给 API）
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DatabaseSnapshot {
    pub present: bool,
    pub size_bytes: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    /// 本进程内成功替换的次数
    pub generation: u64,
}

/// 文件身份戳，用于判断正式路径是否已指向新文件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
    #[cfg(unix)]
    inode: u64,
}

impl FileStamp {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
            #[cfg(unix)]
            inode: {
                use std::os::unix::fs::MetadataExt;
                meta.ino()
            },
        })
    }
}

/// 数据库文件存储
///
/// 写入只发生在 `replace` 中（刷新任务独占），请求处理只读。
/// 不需要显式加锁：rename 是唯一的同步原语。
#[derive(Debug)]
pub struct DatabaseStore {
    path: PathBuf,
    generation: AtomicU64,
}

impl DatabaseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(&config.path)
    }

    /// 当前应打开的数据库路径
    pub fn current_path(&self) -> &Path {
        &self.path
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// 原子替换数据库文件，返回新的 generation
    ///
    /// 任一步骤失败时临时文件被删除，正式文件保持不变。
    pub fn replace(&self, bytes: &[u8]) -> Result<u64> {
        let dir = self.directory();
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }

        let mut tmp = tempfile::Builder::new()
            .prefix(".geoip-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        debug!("Writing {} bytes to {}", bytes.len(), tmp.path().display());

        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            "Database file {} replaced ({} bytes, generation {})",
            self.path.display(),
            bytes.len(),
            generation
        );
        Ok(generation)
    }

    /// 读取数据库文件元信息
    pub fn snapshot(&self) -> DatabaseSnapshot {
        let generation = self.generation();
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => DatabaseSnapshot {
                present: true,
                size_bytes: Some(meta.len()),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                generation,
            },
            Ok(_) => {
                warn!("{} exists but is not a regular file", self.path.display());
                DatabaseSnapshot {
                    generation,
                    ..Default::default()
                }
            }
            Err(_) => DatabaseSnapshot {
                generation,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replace_creates_file() {
        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::new(dir.path().join("city.mmdb"));
        assert!(!store.exists());
        assert_eq!(store.generation(), 0);

        let generation = store.replace(b"first").unwrap();
        assert_eq!(generation, 1);
        assert!(store.exists());
        assert_eq!(std::fs::read(store.current_path()).unwrap(), b"first");
    }

    #[test]
    fn test_replace_overwrites_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::new(dir.path().join("city.mmdb"));
        store.replace(b"first").unwrap();
        store.replace(b"second version").unwrap();

        assert_eq!(std::fs::read(store.current_path()).unwrap(), b"second version");
        assert_eq!(store.generation(), 2);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["city.mmdb".to_string()]);
    }

    #[test]
    fn test_replace_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::new(dir.path().join("nested").join("city.mmdb"));
        store.replace(b"data").unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_open_handle_survives_replace() {
        use std::io::Read;

        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::new(dir.path().join("city.mmdb"));
        store.replace(b"old contents").unwrap();

        let mut old = std::fs::File::open(store.current_path()).unwrap();
        store.replace(b"new contents").unwrap();

        let mut buf = String::new();
        old.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "old contents");
        assert_eq!(std::fs::read(store.current_path()).unwrap(), b"new contents");
    }

    #[test]
    fn test_stamp_changes_after_replace() {
        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::new(dir.path().join("city.mmdb"));
        store.replace(b"aaaa").unwrap();
        let before = FileStamp::read(store.current_path()).unwrap();
        store.replace(b"bbbbbbbb").unwrap();
        let after = FileStamp::read(store.current_path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_snapshot_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::new(dir.path().join("absent.mmdb"));
        let snapshot = store.snapshot();
        assert!(!snapshot.present);
        assert_eq!(snapshot.size_bytes, None);
    }

    #[test]
    fn test_snapshot_present_file() {
        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::new(dir.path().join("city.mmdb"));
        store.replace(&[0u8; 128]).unwrap();
        let snapshot = store.snapshot();
        assert!(snapshot.present);
        assert_eq!(snapshot.size_bytes, Some(128));
        assert!(snapshot.modified.is_some());
        assert_eq!(snapshot.generation, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_replace_keeps_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = DatabaseStore::new(dir.path().join("city.mmdb"));
        store.replace(b"good").unwrap();

        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o500)).unwrap();

        // root 不受目录权限限制，跳过
        if std::fs::File::create(dir.path().join("probe")).is_ok() {
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o700)).unwrap();
            return;
        }

        let result = store.replace(b"never written");
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o700)).unwrap();

        assert!(result.is_err());
        assert_eq!(std::fs::read(store.current_path()).unwrap(), b"good");
        assert_eq!(store.generation(), 1);
    }
}
