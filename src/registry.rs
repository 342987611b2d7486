//! Command registry.
//!
//! Maps a command name to the [`Handler`] that answers it. A registry is
//! seeded with the built-in commands when its control object is created and
//! may be extended by the host before serving starts. Once serving, the
//! registry is shared read-only between connection tasks.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::commands::BUILTINS;
use crate::error::RegistryError;

/// Function invoked for a command: receives the registry it was dispatched
/// from and the positional arguments, and produces the reply text.
pub type HandlerFn = dyn Fn(&Registry, &[String]) -> String + Send + Sync;

/// A named command with a one-line description for `help`.
#[derive(Clone)]
pub struct Handler {
    name: String,
    description: String,
    run: Arc<HandlerFn>,
}

impl Handler {
    /// Create a handler from a function of the command arguments.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        Self::with_registry(name, description, move |_: &Registry, args: &[String]| f(args))
    }

    /// Create a handler whose function also inspects the registry it is
    /// dispatched from.
    pub fn with_registry<F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Registry, &[String]) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            run: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the handler against `registry` with `args`.
    pub fn run(&self, registry: &Registry, args: &[String]) -> String {
        (self.run)(registry, args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Mapping from command name to handler.
///
/// Names are unique and matched exactly; nothing is ever overwritten or
/// removed.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    handlers: BTreeMap<String, Handler>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding a fresh copy of the built-in commands.
    pub fn with_builtins() -> Self {
        let handlers = BUILTINS
            .iter()
            .map(|builtin| (builtin.name.to_string(), builtin.handler()))
            .collect();
        Self { handlers }
    }

    /// Add a single handler.
    pub fn register(&mut self, handler: Handler) -> Result<(), RegistryError> {
        self.register_many([handler])
    }

    /// Add a batch of handlers.
    ///
    /// The batch is validated as a whole before anything is inserted, so a
    /// name collision, either with an existing handler or inside the batch,
    /// leaves the registry untouched.
    pub fn register_many<I>(&mut self, handlers: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let handlers: Vec<Handler> = handlers.into_iter().collect();

        let mut seen = HashSet::with_capacity(handlers.len());
        for handler in &handlers {
            let name = handler.name();
            if name.is_empty() || name.contains('\0') {
                return Err(RegistryError::InvalidName {
                    name: name.to_string(),
                });
            }
            if self.handlers.contains_key(name) || !seen.insert(name) {
                return Err(RegistryError::HandlerExists {
                    name: name.to_string(),
                });
            }
        }

        for handler in handlers {
            debug!(name = handler.name(), "Registered handler");
            self.handlers.insert(handler.name.clone(), handler);
        }
        Ok(())
    }

    /// Find the handler registered under exactly `name`.
    pub fn lookup(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    /// All handlers, sorted by name.
    pub fn handlers(&self) -> impl Iterator<Item = &Handler> {
        self.handlers.values()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
