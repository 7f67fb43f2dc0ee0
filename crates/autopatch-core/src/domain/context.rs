//! File context supplied by the repository-analysis layer.

use serde::{Deserialize, Serialize};

/// One analyzed source file, as handed to the plan generator.
///
/// Produced by the repository-analysis layer outside this crate; the
/// pipeline only consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileContext {
    /// Path relative to the session root.
    pub path: String,

    /// Full file content.
    pub content: String,

    /// Detected language, e.g. "rust" or "python".
    pub language: Option<String>,

    /// Import/use statements extracted from the file.
    pub imports: Vec<String>,

    /// Type (class/struct/enum) names extracted from the file.
    pub types: Vec<String>,

    /// Function names extracted from the file.
    pub functions: Vec<String>,
}

impl FileContext {
    /// Create a context carrying only path and content.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            language: None,
            imports: Vec::new(),
            types: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Set the detected language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set extracted symbols.
    pub fn with_symbols(
        mut self,
        imports: Vec<String>,
        types: Vec<String>,
        functions: Vec<String>,
    ) -> Self {
        self.imports = imports;
        self.types = types;
        self.functions = functions;
        self
    }

    /// One-line header used when embedding the file into a prompt.
    pub fn header_line(&self) -> String {
        match &self.language {
            Some(lang) => format!("{} ({})", self.path, lang),
            None => self.path.clone(),
        }
    }
}
