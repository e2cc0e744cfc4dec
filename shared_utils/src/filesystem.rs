//! Filesystem capability
//!
//! The conversion engine only touches the disk through this trait so tests can
//! refuse permissions or fake free space without needing a special mount.

use std::fs;
use std::io;
use std::path::Path;

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_readable(&self, path: &Path) -> bool;
    fn is_dir_writable(&self, dir: &Path) -> bool;
    fn file_size(&self, path: &Path) -> Option<u64>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    /// Bytes available to an unprivileged user on the volume holding `path`.
    fn free_space(&self, path: &Path) -> Option<u64>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_readable(&self, path: &Path) -> bool {
        #[cfg(unix)]
        {
            unix::access(path, libc::R_OK)
        }
        #[cfg(not(unix))]
        {
            fs::File::open(path).is_ok()
        }
    }

    fn is_dir_writable(&self, dir: &Path) -> bool {
        if !dir.is_dir() {
            return false;
        }
        #[cfg(unix)]
        {
            unix::access(dir, libc::W_OK)
        }
        #[cfg(not(unix))]
        {
            fs::metadata(dir)
                .map(|m| !m.permissions().readonly())
                .unwrap_or(false)
        }
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn free_space(&self, path: &Path) -> Option<u64> {
        #[cfg(unix)]
        {
            unix::statvfs_available(path)
        }
        #[cfg(not(unix))]
        {
            let _ = path;
            None
        }
    }
}

#[cfg(unix)]
mod unix {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    fn c_path(path: &Path) -> Option<CString> {
        CString::new(path.as_os_str().as_bytes()).ok()
    }

    pub(super) fn access(path: &Path, mode: libc::c_int) -> bool {
        match c_path(path) {
            // SAFETY: `c` is a valid NUL-terminated string for the duration of the call.
            Some(c) => unsafe { libc::access(c.as_ptr(), mode) == 0 },
            None => false,
        }
    }

    pub(super) fn statvfs_available(path: &Path) -> Option<u64> {
        let c = c_path(path)?;
        // SAFETY: statvfs only writes into the zeroed struct we own.
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c.as_ptr(), &mut stat) };
        if rc != 0 {
            return None;
        }
        #[allow(clippy::unnecessary_cast)]
        Some(stat.f_bavail as u64 * stat.f_frsize as u64)
    }
}
