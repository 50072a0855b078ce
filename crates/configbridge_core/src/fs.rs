//! File system seam.

use std::io;
use std::path::Path;

/// The only file system operations the pipeline needs.
pub trait FileSystem {
    /// True when `path` names an existing regular file.
    fn exists(&self, path: &Path) -> bool;
    fn read_all_text(&self, path: &Path) -> io::Result<String>;
}

/// [`FileSystem`] over the real disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_all_text(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn read_all_text(&self, path: &Path) -> io::Result<String> {
        (**self).read_all_text(path)
    }
}
