//! crates/logging/src/config.rs
//! Verbosity configuration.

/// Default label for diagnostics when no program name is supplied.
const DEFAULT_PROGRAM: &str = "sink";

/// Verbosity level and diagnostic context.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// Number of `-v` flags given (0 = warnings only).
    pub level: u8,
    /// Program name attached to diagnostics.
    pub program: String,
}

impl Default for VerbosityConfig {
    fn default() -> Self {
        Self {
            level: 0,
            program: DEFAULT_PROGRAM.to_owned(),
        }
    }
}

impl VerbosityConfig {
    /// Creates a configuration from a `-v` count.
    pub fn from_verbose_level(level: u8) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Replaces the program name.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Derives the program name from `argv[0]`, keeping only the file name.
    pub fn with_program_from_arg0(self, arg0: &std::ffi::OsStr) -> Self {
        let name = std::path::Path::new(arg0)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty());
        match name {
            Some(name) => self.with_program(name),
            None => self,
        }
    }
}
