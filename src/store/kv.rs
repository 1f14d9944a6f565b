//! Key-value persistence backends

use crate::error::BalanceError;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Minimal string key-value store
pub trait KvStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, BalanceError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), BalanceError>;
    fn remove_item(&self, key: &str) -> Result<(), BalanceError>;
    /// All keys, sorted
    fn keys(&self) -> Result<Vec<String>, BalanceError>;
}

/// In-memory store for tests and embedded callers
#[derive(Debug, Default)]
pub struct MemoryKv {
    items: RefCell<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get_item(&self, key: &str) -> Result<Option<String>, BalanceError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BalanceError> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), BalanceError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BalanceError> {
        Ok(self.items.borrow().keys().cloned().collect())
    }
}

/// Directory-backed store: one `<encoded key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileKv {
    root: PathBuf,
}

const FILE_SUFFIX: &str = ".json";

impl FileKv {
    /// Open (and create if needed) a store directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self, BalanceError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{FILE_SUFFIX}", encode_key(key)))
    }
}

impl KvStore for FileKv {
    fn get_item(&self, key: &str) -> Result<Option<String>, BalanceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BalanceError> {
        // Write then rename so readers never see a partial file
        let path = self.path_for(key);
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", encode_key(key), uuid::Uuid::new_v4()));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), BalanceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, BalanceError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(encoded) = name.strip_suffix(FILE_SUFFIX) {
                if let Some(key) = decode_key(encoded) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_.-]`
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'.') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn decode_key(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_kv() {
        let kv = MemoryKv::new();
        assert!(kv.get_item("a").unwrap().is_none());
        kv.set_item("b", "2").unwrap();
        kv.set_item("a", "1").unwrap();
        assert_eq!(kv.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
        kv.remove_item("a").unwrap();
        assert!(kv.get_item("a").unwrap().is_none());
    }

    #[test]
    fn test_key_encoding() {
        let encoded = encode_key("plan_v1:2026-01-01");
        assert_eq!(encoded, "plan_v1%3A2026-01-01");
        assert_eq!(decode_key(&encoded).as_deref(), Some("plan_v1:2026-01-01"));
        assert!(decode_key("bad%zz").is_none());
    }

    #[test]
    fn test_file_kv_roundtrip() {
        let dir = TempDir::new().unwrap();
        let kv = FileKv::open(dir.path().join("store")).unwrap();

        kv.set_item("records:v1", "{}").unwrap();
        kv.set_item("plan:2026-01-02", "[]").unwrap();
        assert_eq!(kv.get_item("records:v1").unwrap().as_deref(), Some("{}"));
        assert_eq!(kv.keys().unwrap(), vec!["plan:2026-01-02".to_string(), "records:v1".to_string()]);

        kv.remove_item("records:v1").unwrap();
        kv.remove_item("records:v1").unwrap();
        assert!(kv.get_item("records:v1").unwrap().is_none());
    }

    #[test]
    fn test_file_kv_concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let kv = kv.clone();
                scope.spawn(move || {
                    for round in 0..25 {
                        kv.set_item("shared", &format!("{worker}:{round}")).unwrap();
                        kv.set_item(&format!("own:{worker}"), &round.to_string()).unwrap();
                    }
                });
            }
        });

        let shared = kv.get_item("shared").unwrap().unwrap();
        assert!(shared.ends_with(":24"));
        for worker in 0..4 {
            assert_eq!(kv.get_item(&format!("own:{worker}")).unwrap().as_deref(), Some("24"));
        }

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        assert_eq!(kv.keys().unwrap().len(), 5);
    }
}
