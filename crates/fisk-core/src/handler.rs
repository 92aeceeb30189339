//! Dispatch seam between the client and domain collaborators.
//!
//! Domain code (invoice submission, status polling, ...) registers one
//! handler per request type. A handler receives the opaque JSON payload and
//! performs the actual upstream call; the client never looks inside either
//! the payload or the response.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::upstream::UpstreamError;

/// Future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, UpstreamError>> + Send>>;

/// One domain call against the authority.
pub trait RequestHandler: Send + Sync {
    fn call(&self, payload: Value) -> HandlerFuture;
}

struct FnHandler<F>(F);

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(Value) -> HandlerFuture + Send + Sync,
{
    fn call(&self, payload: Value) -> HandlerFuture {
        (self.0)(payload)
    }
}

/// Wrap an async closure as a [`RequestHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn RequestHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, UpstreamError>> + Send + 'static,
{
    Arc::new(FnHandler(move |payload| {
        Box::pin(f(payload)) as HandlerFuture
    }))
}

/// Registry of request type → handler, resolved during queue draining.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn RequestHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for a request type.
    pub fn register(&mut self, request_type: &str, handler: Arc<dyn RequestHandler>) {
        self.handlers.insert(request_type.to_string(), handler);
    }

    pub fn get(&self, request_type: &str) -> Option<Arc<dyn RequestHandler>> {
        self.handlers.get(request_type).cloned()
    }

    pub fn contains(&self, request_type: &str) -> bool {
        self.handlers.contains_key(request_type)
    }

    /// Registered request types, sorted for stable display.
    pub fn request_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}
