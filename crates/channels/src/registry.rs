use std::{collections::HashMap, sync::Arc};

use crate::CommandHandler;

/// Registry of chat commands, keyed by command word.
pub struct CommandRegistry {
    prefix: String,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new("!")
    }
}

impl CommandRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers
            .insert(handler.name().to_lowercase(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&name.to_lowercase()).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve the handler a chat line invokes, if any.
    ///
    /// Lines without the prefix and unknown commands resolve to `None`.
    pub fn resolve(&self, text: &str) -> Option<Arc<dyn CommandHandler>> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix(self.prefix.as_str())?;
        if name.is_empty() {
            return None;
        }
        self.get(name)
    }
}
