//! Parsing options and configuration.

/// Options for reading DOCX packages.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode for optional package parts
    pub error_mode: ErrorMode,

    /// Whether to load image payloads
    pub extract_resources: bool,

    /// Largest image payload to load in MB (0 = unlimited)
    pub memory_limit_mb: u32,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (ignore malformed optional parts).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set the per-image size limit in MB.
    pub fn with_memory_limit(mut self, mb: u32) -> Self {
        self.memory_limit_mb = mb;
        self
    }

    /// Enable or disable image payload loading.
    pub fn with_resources(mut self, extract: bool) -> Self {
        self.extract_resources = extract;
        self
    }

    /// Skip image payloads entirely.
    pub fn text_only(mut self) -> Self {
        self.extract_resources = false;
        self
    }

    /// Size limit in bytes, if any.
    pub(crate) fn resource_limit_bytes(&self) -> Option<u64> {
        if self.memory_limit_mb == 0 {
            None
        } else {
            Some(u64::from(self.memory_limit_mb) * 1024 * 1024)
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            extract_resources: true,
            memory_limit_mb: 0,
        }
    }
}

/// Error handling mode during parsing.
///
/// The main document part is always required; the mode decides what happens
/// when styles, numbering, relationships or core properties are malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any malformed part
    #[default]
    Strict,
    /// Log and continue without the malformed part
    Lenient,
}
