//! Middleware chaining.
//!
//! A [`Middleware`] turns one [`Handler`] into another. [`chain`] composes an
//! ordered list of them around a terminal handler so that the first-listed
//! middleware is the outermost wrapper: it sees the request first and the
//! response last.

use std::{convert::Infallible, fmt, sync::Arc};

use axum::{extract::Request, response::Response};
use tower::{Layer, Service, util::BoxCloneSyncService};

/// A type-erased request handler. Every route group, middleware output and
/// terminal dispatcher is one of these.
pub type Handler = BoxCloneSyncService<Request, Response, Infallible>;

/// Middleware
///
/// A named `Handler -> Handler` transformation. It owns nothing beyond what it
/// captured when it was built, so the same value can wrap many handlers.
///
/// The return type is a `Handler`, not an `Option`: a middleware that wants to
/// stop a request must still answer it.
#[derive(Clone)]
pub struct Middleware {
    name: &'static str,
    wrap: Arc<dyn Fn(Handler) -> Handler + Send + Sync>,
}

impl Middleware {
    pub fn new<F>(name: &'static str, wrap: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self {
            name,
            wrap: Arc::new(wrap),
        }
    }

    /// Builds a middleware from any tower layer whose services speak
    /// `Request -> Response`, e.g. `axum::middleware::from_fn_with_state`.
    pub fn from_layer<L>(name: &'static str, layer: L) -> Self
    where
        L: Layer<Handler> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self::new(name, move |inner| Handler::new(layer.layer(inner)))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, handler: Handler) -> Handler {
        (self.wrap)(handler)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name).finish()
    }
}

/// Wraps `handler` so that `middlewares[0]` runs first.
///
/// Folds from the last middleware to the first; an empty slice hands back the
/// terminal handler untouched.
pub fn chain(handler: Handler, middlewares: &[Middleware]) -> Handler {
    middlewares
        .iter()
        .rev()
        .fold(handler, |inner, middleware| middleware.apply(inner))
}
