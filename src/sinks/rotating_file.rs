//! Time-templated rotating file sink
//!
//! The destination path is re-rendered from a `%`-token template on every
//! write; when the rendered path changes (a new hour, a new day), or the
//! file underneath the open handle disappears (external logrotate), the old
//! handle is closed and a new one is opened lazily, creating parent
//! directories on demand.

use super::{format_entry, HeaderFormatter, Sink};
use crate::core::datetime::DateTime;
use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default template, relative so it roots at the working directory in use
/// when the first write happens.
pub const DEFAULT_PATH_TEMPLATE: &str = "output.log.%Y-%m-%d-%H";

/// Append-open `name` under `folder`; when the first attempt fails because
/// the folder is missing, create it and retry once.
fn open_file(folder: &Path, name: &str) -> Result<File> {
    let path = folder.join(name);
    let open = |p: &Path| OpenOptions::new().create(true).append(true).open(p);
    match open(&path) {
        Ok(file) => Ok(file),
        Err(err) => {
            match std::fs::metadata(folder) {
                Ok(meta) if meta.is_dir() => {
                    return Err(LoggerError::file_open(path.display().to_string(), err))
                }
                Ok(_) => return Err(LoggerError::not_a_directory(folder.display().to_string())),
                Err(_) => {
                    std::fs::create_dir_all(folder)?;
                }
            }
            open(&path).map_err(|e| LoggerError::file_open(path.display().to_string(), e))
        }
    }
}

/// Lazily-opened append handle keyed by (folder, name).
struct LazyFile {
    folder: PathBuf,
    name: String,
    handle: Option<File>,
}

impl LazyFile {
    fn new() -> Self {
        Self {
            folder: PathBuf::new(),
            name: String::new(),
            handle: None,
        }
    }

    /// Retarget the handle; closes the old file when the path changed.
    fn set_path(&mut self, folder: PathBuf, name: String) {
        if self.folder == folder && self.name == name {
            return;
        }
        self.close();
        self.folder = folder;
        self.name = name;
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        match self.handle {
            None => {
                self.handle = Some(open_file(&self.folder, &self.name)?);
            }
            Some(_) => {
                // The file may have been rotated away underneath us.
                if std::fs::metadata(self.folder.join(&self.name)).is_err() {
                    self.close();
                    self.handle = Some(open_file(&self.folder, &self.name)?);
                }
            }
        }
        let handle = self.handle.as_mut().expect("handle opened above");
        handle.write_all(bytes)?;
        Ok(())
    }

    fn close(&mut self) {
        self.handle = None;
    }
}

struct FileInner {
    template: String,
    file: LazyFile,
    time: DateTime,
    header: Option<HeaderFormatter>,
}

/// File sink whose destination is derived from a time template such as
/// `logs/app.%Y-%m-%d.log`. An empty template falls back to
/// [`DEFAULT_PATH_TEMPLATE`].
pub struct RotatingFileSink {
    inner: Mutex<FileInner>,
}

impl RotatingFileSink {
    pub fn new(template: impl Into<String>) -> Self {
        let mut template = template.into();
        if template.is_empty() {
            template = DEFAULT_PATH_TEMPLATE.to_string();
        }
        Self {
            inner: Mutex::new(FileInner {
                template,
                file: LazyFile::new(),
                time: DateTime::new(),
                header: None,
            }),
        }
    }

    /// Folder and file name the template currently resolves to.
    fn next_path(inner: &FileInner) -> (PathBuf, String) {
        let rendered = inner.time.format(&inner.template);
        let path = Path::new(&rendered);
        let folder = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (folder, name)
    }
}

impl Sink for RotatingFileSink {
    fn write(&self, unix: i64, level: LogLevel, file: &str, line: u32, message: &str) -> Result<()> {
        let inner = &mut *self.inner.lock();
        inner.time.flush_to(unix);
        let (folder, name) = Self::next_path(inner);
        inner.file.set_path(folder, name);
        let buf = format_entry(inner.header.as_ref(), level.to_str(), file, line, &inner.time, message);
        inner.file.write_all(buf.as_bytes())
    }

    fn set_header_formatter(&self, formatter: HeaderFormatter) {
        self.inner.lock().header = Some(formatter);
    }

    fn close(&self) -> Result<()> {
        self.inner.lock().file.close();
        Ok(())
    }

    fn name(&self) -> &str {
        "rotating_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::datetime::{local_offset, unix_now};

    #[test]
    fn test_empty_template_uses_default() {
        let sink = RotatingFileSink::new("");
        assert_eq!(sink.inner.lock().template, DEFAULT_PATH_TEMPLATE);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir
            .path()
            .join("nested/deeper/app.%Y.log")
            .to_string_lossy()
            .into_owned();
        let sink = RotatingFileSink::new(template);
        sink.write(unix_now(), LogLevel::Info, "t.rs", 1, "first")
            .unwrap();

        let year = crate::core::datetime::date_clock(unix_now() + local_offset()).year;
        let expected = dir.path().join(format!("nested/deeper/app.{year}.log"));
        let content = std::fs::read_to_string(expected).unwrap();
        assert!(content.ends_with(" first\n"));
    }

    #[test]
    fn test_reopens_when_file_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("app.log").to_string_lossy().into_owned();
        let sink = RotatingFileSink::new(template.clone());
        let now = unix_now();
        sink.write(now, LogLevel::Info, "t.rs", 1, "one").unwrap();
        std::fs::remove_file(&template).unwrap();
        sink.write(now, LogLevel::Info, "t.rs", 2, "two").unwrap();
        let content = std::fs::read_to_string(&template).unwrap();
        assert!(content.contains("two"));
        assert!(!content.contains("one"));
    }

    #[test]
    fn test_path_change_switches_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("by-sec.%S.log").to_string_lossy().into_owned();
        let sink = RotatingFileSink::new(template);
        // Two timestamps one second apart resolve to two files.
        let base = 1_700_000_000;
        sink.write(base, LogLevel::Info, "t.rs", 1, "a").unwrap();
        sink.write(base + 1, LogLevel::Info, "t.rs", 2, "b").unwrap();
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 2);
    }
}
