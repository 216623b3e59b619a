//! Component source loading

use std::collections::HashMap;

use fos_template::{CompileOptions, CompiledComponent};

use crate::LoadError;

/// Resolves a path to a compiled component
pub trait ComponentLoader {
    fn load(&self, path: &str) -> Result<CompiledComponent, LoadError>;
}

/// In-memory sources keyed by path
#[derive(Debug, Clone, Default)]
pub struct SourceLoader {
    sources: HashMap<String, String>,
    options: CompileOptions,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, path: &str, source: &str) -> Self {
        self.insert(path, source);
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn insert(&mut self, path: &str, source: &str) {
        self.sources.insert(path.to_string(), source.to_string());
    }
}

impl ComponentLoader for SourceLoader {
    fn load(&self, path: &str) -> Result<CompiledComponent, LoadError> {
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| LoadError::NotFound(path.to_string()))?;
        tracing::debug!("Compiling component source '{}'", path);
        fos_template::compile_with(source, &self.options).map_err(|source| LoadError::Compile {
            path: path.to_string(),
            source,
        })
    }
}
