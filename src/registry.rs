//! Parser registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::TranscodeConfig;
use crate::error::{Error, ErrorContext};
use crate::parsers::{create_parser, Parser, ParserKind};

/// Name -> parser lookup. Parsers are stateless, so handing out clones of the
/// `Arc` is all callers need for concurrent use.
#[derive(Debug, Default)]
pub struct ParserRegistry {
    parsers: RwLock<HashMap<String, Arc<dyn Parser>>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in parser under its own name.
    pub fn with_defaults(config: &TranscodeConfig) -> Self {
        let registry = Self::new();
        for kind in ParserKind::ALL {
            registry.register(Arc::from(create_parser(kind, config)));
        }
        registry
    }

    /// Register a parser under its typed name, replacing any previous one.
    pub fn register(&self, parser: Arc<dyn Parser>) -> Option<Arc<dyn Parser>> {
        let name = parser.typed_name().name.clone();
        self.write().insert(name, parser)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Parser>> {
        self.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Parser>> {
        self.read().get(name).cloned()
    }

    /// Like [`get`](Self::get), but a missing parser is a configuration error.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Parser>, Error> {
        self.get(name).ok_or_else(|| {
            Error::configuration(
                format!("parser '{}' is not registered", name),
                ErrorContext::new().with_source("parser_registry"),
            )
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    // A poisoned lock only means another thread panicked mid-insert; the map
    // itself is still consistent.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn Parser>>> {
        self.parsers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn Parser>>> {
        self.parsers.write().unwrap_or_else(|e| e.into_inner())
    }
}

static DEFAULT_REGISTRY: once_cell::sync::Lazy<ParserRegistry> =
    once_cell::sync::Lazy::new(|| ParserRegistry::with_defaults(&TranscodeConfig::default()));

/// Process-wide registry of the built-in parsers with default configuration.
pub fn default_registry() -> &'static ParserRegistry {
    &DEFAULT_REGISTRY
}
