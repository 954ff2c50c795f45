//! Configuration for field store sessions.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Configuration for a field store session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Memory-map files opened read-only.
    pub use_mmap: bool,

    /// Sync data to disk when a written file is closed.
    pub sync_on_close: bool,

    /// Upper bound on the number of files linked into one session.
    pub max_linked_files: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            use_mmap: true,
            sync_on_close: true,
            max_linked_files: 1024,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FIELD_STORE_MMAP") {
            config.use_mmap = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FIELD_STORE_SYNC_ON_CLOSE") {
            config.sync_on_close = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FIELD_STORE_MAX_FILES") {
            if let Ok(max) = val.parse() {
                config.max_linked_files = max;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_linked_files == 0 {
            return Err("max_linked_files must be > 0".to_string());
        }

        // File indexes must fit in a field key
        if self.max_linked_files > crate::types::FieldKey::MAX_INDEX + 1 {
            return Err("max_linked_files exceeds the key file index range".to_string());
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

/// Access requested for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    /// Truncate existing files when opening with write permission.
    pub clear: bool,
}

impl OpenMode {
    pub const fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            clear: false,
        }
    }

    /// Write permission only. Existing files are replaced.
    pub const fn write_only() -> Self {
        Self {
            read: false,
            write: true,
            clear: false,
        }
    }

    /// Read and append to existing files.
    pub const fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            clear: false,
        }
    }

    /// Same mode, truncating files on open.
    pub fn cleared(mut self) -> Self {
        self.clear = true;
        self
    }

    /// Parse a mode string made of `r`, `w` and `c` (clear), case-insensitive.
    pub fn parse(s: &str) -> Result<Self> {
        let mut mode = Self::default();
        for c in s.chars() {
            match c.to_ascii_lowercase() {
                'r' => mode.read = true,
                'w' => mode.write = true,
                'c' => mode.clear = true,
                '+' | ' ' => {}
                other => {
                    return Err(StoreError::Config(format!(
                        "unknown open mode flag '{}' in '{}'",
                        other, s
                    )))
                }
            }
        }
        mode.validate()?;
        Ok(mode)
    }

    /// A mode must request reading or writing.
    pub fn validate(&self) -> Result<()> {
        if !self.read && !self.write {
            return Err(StoreError::Config(
                "neither read nor write access requested".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether existing content is discarded on open.
    pub fn truncates(&self) -> bool {
        self.write && (self.clear || !self.read)
    }

    /// Whether files are mapped into memory on open.
    pub fn maps(&self) -> bool {
        self.read && !self.write
    }
}

impl std::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.read {
            write!(f, "r")?;
        }
        if self.write {
            write!(f, "w")?;
        }
        if self.clear {
            write!(f, "c")?;
        }
        Ok(())
    }
}
