//! Handler registry: method-name dispatch for RPC requests.
//!
//! # Design Decisions
//! - The name → handler map is fixed at construction (builder), so dispatch
//!   is a single lookup per request, never reflective
//! - Handlers receive and return opaque payload bytes; interpretation is
//!   entirely theirs

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

/// Error type for per-request handler failures.
///
/// These never tear down the connection; the worker converts them into
/// RPC-level error responses.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The requested method is not registered.
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    /// The handler itself reported a failure.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Convenience constructor for handler-reported failures.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, HandlerError>> + Send>>;
type HandlerFn = Box<dyn Fn(Vec<u8>) -> HandlerFuture + Send + Sync>;

/// Immutable mapping from method name to handler function.
pub struct HandlerRegistry {
    methods: HashMap<String, HandlerFn>,
}

impl HandlerRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            methods: HashMap::new(),
        }
    }

    /// Invoke the handler registered for `method` with the raw argument bytes.
    pub async fn dispatch(&self, method: &str, args: Vec<u8>) -> Result<Vec<u8>, HandlerError> {
        let handler = self
            .methods
            .get(method)
            .ok_or_else(|| HandlerError::UnknownMethod(method.to_string()))?;
        handler(args).await
    }

    /// Registered method names, for startup logging.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("methods", &self.method_names())
            .finish()
    }
}

/// Builder collecting handlers before the registry is frozen.
pub struct RegistryBuilder {
    methods: HashMap<String, HandlerFn>,
}

impl RegistryBuilder {
    /// Register an async handler function under a method name.
    ///
    /// Registering the same name twice keeps the later handler.
    pub fn register<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>, HandlerError>> + Send + 'static,
    {
        self.methods.insert(
            name.into(),
            Box::new(move |args| -> HandlerFuture { Box::pin(handler(args)) }),
        );
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> Arc<HandlerRegistry> {
        Arc::new(HandlerRegistry {
            methods: self.methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_resolves_registered_method() {
        let registry = HandlerRegistry::builder()
            .register("upper", |args: Vec<u8>| async move {
                Ok(args.to_ascii_uppercase())
            })
            .build();

        let out = registry.dispatch("upper", b"abc".to_vec()).await.unwrap();
        assert_eq!(out, b"ABC");
    }

    #[tokio::test]
    async fn dispatch_unknown_method_fails() {
        let registry = HandlerRegistry::builder().build();
        match registry.dispatch("missing", Vec::new()).await {
            Err(HandlerError::UnknownMethod(name)) => assert_eq!(name, "missing"),
            other => panic!("expected unknown method, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn later_registration_wins() {
        let registry = HandlerRegistry::builder()
            .register("m", |_| async { Ok(b"first".to_vec()) })
            .register("m", |_| async { Ok(b"second".to_vec()) })
            .build();

        let out = registry.dispatch("m", Vec::new()).await.unwrap();
        assert_eq!(out, b"second");
        assert_eq!(registry.method_names(), vec!["m"]);
    }
}
