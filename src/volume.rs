//! Directory-backed log volume

use blackbox_core::pipeline::{LogFile, Volume};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Log files stored as plain files in one directory
#[derive(Debug, Clone)]
pub struct DirVolume {
    dir: PathBuf,
}

impl DirVolume {
    /// Volume rooted at `dir`
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// The directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Volume for DirVolume {
    type File = DirFile;
    type Error = io::Error;

    fn mount(&mut self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        if !self.dir.is_dir() {
            return Err(io::Error::other(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        Ok(())
    }

    fn exists(&mut self, name: &str) -> bool {
        self.dir.join(name).exists()
    }

    fn create(&mut self, name: &str) -> io::Result<DirFile> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.dir.join(name))?;
        Ok(DirFile { file })
    }
}

/// One log file
#[derive(Debug)]
pub struct DirFile {
    file: File,
}

impl LogFile for DirFile {
    type Error = io::Error;

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }

    /// Only `grow` touches the file: it is extended to `bytes` up front and
    /// the log overwrites the zeroed space from the start. Without `grow`
    /// a host filesystem has nothing to check in advance.
    fn preallocate(&mut self, bytes: u64, grow: bool) -> io::Result<()> {
        if grow && self.file.metadata()?.len() < bytes {
            self.file.set_len(bytes)?;
        }
        Ok(())
    }
}
