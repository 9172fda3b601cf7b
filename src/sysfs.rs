use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use log::{debug, warn};

// Control nodes are single-line pseudo-files; a small window is enough.
const READ_WINDOW: usize = 512;

/// Read the first line of `path`, without its terminator.
///
/// Any I/O failure (including a missing file) yields `None`.
pub fn read_one_line(path: &Path) -> Option<String> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("NODE: no such file {} for reading", path.display());
            return None;
        }
        Err(e) => {
            warn!("NODE: could not open {} ({})", path.display(), e);
            return None;
        }
    };

    let mut reader = BufReader::with_capacity(READ_WINDOW, file);
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf) {
        // An empty node has no line at all.
        Ok(0) => None,
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }
            // Drivers may emit bytes that are not UTF-8; decode lossily.
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
        Err(e) => {
            warn!("NODE: could not read from {} ({})", path.display(), e);
            None
        }
    }
}

/// Truncate `path` and write exactly `value`. Returns false on any I/O error.
///
/// The file is never created: a control node that does not exist stays absent.
pub fn write_line(path: &Path, value: &str) -> bool {
    let res = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .and_then(|mut f| {
            f.write_all(value.as_bytes())?;
            f.flush()
        });

    match res {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("NODE: no such file {} for writing", path.display());
            false
        }
        Err(e) => {
            warn!("NODE: could not write to {} ({})", path.display(), e);
            false
        }
    }
}

/// Interpret a node line as a boolean: `"0"` is false, any other line is
/// true, and no line at all yields `default`.
pub fn line_as_bool(line: Option<&str>, default: bool) -> bool {
    match line {
        Some(v) => v != "0",
        None => default,
    }
}

pub fn read_bool(path: &Path, default: bool) -> bool {
    line_as_bool(read_one_line(path).as_deref(), default)
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// True when the file exists and can be opened for reading.
pub fn readable(path: &Path) -> bool {
    exists(path) && File::open(path).is_ok()
}

/// True when the file exists and can be opened for writing.
///
/// Opening without truncation leaves the node's value untouched.
pub fn writable(path: &Path) -> bool {
    if !exists(path) {
        return false;
    }
    match fs::metadata(path) {
        Ok(m) if m.is_dir() => false,
        Ok(_) => OpenOptions::new().write(true).open(path).is_ok(),
        Err(_) => false,
    }
}

/// Seam between the controller and the filesystem. Tests substitute nodes
/// that misbehave the way real kernel drivers sometimes do.
pub trait NodeIo: Send + Sync {
    fn read_one_line(&self, path: &Path) -> Option<String>;
    fn write_line(&self, path: &Path, value: &str) -> bool;
    fn exists(&self, path: &Path) -> bool;
    fn readable(&self, path: &Path) -> bool;
    fn writable(&self, path: &Path) -> bool;

    fn read_bool(&self, path: &Path, default: bool) -> bool {
        line_as_bool(self.read_one_line(path).as_deref(), default)
    }
}

/// The real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sysfs;

impl NodeIo for Sysfs {
    fn read_one_line(&self, path: &Path) -> Option<String> {
        read_one_line(path)
    }

    fn write_line(&self, path: &Path, value: &str) -> bool {
        write_line(path, value)
    }

    fn exists(&self, path: &Path) -> bool {
        exists(path)
    }

    fn readable(&self, path: &Path) -> bool {
        readable(path)
    }

    fn writable(&self, path: &Path) -> bool {
        writable(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_first_line_only() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("node");
        fs::write(&node, "1\nsecond\n").unwrap();
        assert_eq!(read_one_line(&node).as_deref(), Some("1"));
    }

    #[test]
    fn read_missing_or_empty_is_none() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("node");
        assert_eq!(read_one_line(&node), None);

        fs::write(&node, "").unwrap();
        assert_eq!(read_one_line(&node), None);
    }

    #[test]
    fn strips_crlf() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("node");
        fs::write(&node, "0\r\n").unwrap();
        assert_eq!(read_one_line(&node).as_deref(), Some("0"));
    }

    #[test]
    fn write_truncates_previous_content() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("node");
        fs::write(&node, "enabled-long-value\n").unwrap();

        assert!(write_line(&node, "0"));
        assert_eq!(fs::read_to_string(&node).unwrap(), "0");
    }

    #[test]
    fn write_does_not_create_missing_node() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("absent");
        assert!(!write_line(&node, "1"));
        assert!(!node.exists());
    }

    #[test]
    fn bool_interpretation() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("node");

        assert!(!read_bool(&node, false));
        assert!(read_bool(&node, true));

        for (content, want) in [("0", false), ("1", true), ("2", true), ("Y", true), ("0 ", true)] {
            fs::write(&node, content).unwrap();
            assert_eq!(read_bool(&node, false), want, "content {:?}", content);
            assert_eq!(Sysfs.read_bool(&node, false), want, "content {:?}", content);
        }

        assert!(!line_as_bool(Some("0"), true));
        assert!(line_as_bool(Some(""), false));
        assert!(line_as_bool(None, true));
    }

    #[test]
    fn non_utf8_content_reads_as_on() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("node");
        fs::write(&node, b"\xff\n").unwrap();

        assert_eq!(read_one_line(&node).as_deref(), Some("\u{fffd}"));
        assert!(read_bool(&node, false));
        assert!(Sysfs.read_bool(&node, false));
    }

    #[test]
    fn predicates() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("node");
        assert!(!exists(&node));
        assert!(!readable(&node));
        assert!(!writable(&node));

        fs::write(&node, "0").unwrap();
        assert!(exists(&node));
        assert!(readable(&node));
        assert!(writable(&node));
        assert_eq!(fs::read_to_string(&node).unwrap(), "0");

        assert!(!writable(dir.path()));
    }
}
