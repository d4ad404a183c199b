//! Route groups and the parent route table.
//!
//! A group owns a private inner router. Its routes are registered at paths
//! relative to the group root; the group is then wrapped in its middleware
//! chain and nested under its prefix, which strips the prefix before the inner
//! router sees the request. The only way into a group's routes is through its
//! own chain.

use std::collections::BTreeSet;

use axum::{Router, routing::MethodRouter};

use crate::{
    chain::{Handler, Middleware, chain},
    handlers,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("invalid group prefix `{prefix}`: {reason}")]
    InvalidPrefix {
        prefix: String,
        reason: &'static str,
    },
    #[error("invalid route path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("route `{path}` is registered twice")]
    DuplicateRoute { path: String },
    #[error("`{path}` conflicts with mounted prefix `{existing}`")]
    PrefixConflict { path: String, existing: String },
}

/// RouteGroup
///
/// Handle passed to a group's registration function. Paths given to
/// [`RouteGroup::handle`] are relative to the group prefix.
pub struct RouteGroup<S = ()> {
    prefix: String,
    router: Router<S>,
    paths: BTreeSet<String>,
}

impl<S> RouteGroup<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            router: Router::new(),
            paths: BTreeSet::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers `method_router` at `path` inside the group.
    ///
    /// Fails if the path is malformed or was already registered in this group.
    pub fn handle(
        &mut self,
        path: &str,
        method_router: MethodRouter<S>,
    ) -> Result<&mut Self, RouteError> {
        validate_path(path)?;

        let full_path = format!("{}{}", self.prefix, path);
        if !self.paths.insert(full_path.clone()) {
            return Err(RouteError::DuplicateRoute { path: full_path });
        }

        let router = std::mem::take(&mut self.router);
        self.router = router.route(path, method_router);
        Ok(self)
    }

    /// Full (prefixed) paths registered so far, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// RouteTable
///
/// Builder for the parent dispatcher. Built once at startup, then frozen into
/// an axum [`Router`] with [`RouteTable::into_router`].
pub struct RouteTable<S = ()> {
    state: S,
    router: Router<S>,
    prefixes: Vec<String>,
    routes: BTreeSet<String>,
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(state: S) -> Self {
        Self {
            state,
            router: Router::new(),
            prefixes: Vec::new(),
            routes: BTreeSet::new(),
        }
    }

    /// Registers an ungrouped route directly on the parent dispatcher.
    pub fn route(mut self, path: &str, method_router: MethodRouter<S>) -> Result<Self, RouteError> {
        validate_path(path)?;

        if let Some(existing) = self.prefixes.iter().find(|p| overlaps(p, path)) {
            return Err(RouteError::PrefixConflict {
                path: path.to_string(),
                existing: existing.clone(),
            });
        }
        if !self.routes.insert(path.to_string()) {
            return Err(RouteError::DuplicateRoute {
                path: path.to_string(),
            });
        }

        self.router = self.router.route(path, method_router);
        Ok(self)
    }

    /// Mounts a route group under `prefix`.
    ///
    /// `register` fills the group; `middlewares` wrap it, first one outermost.
    /// Requests for `prefix` and anything below it reach the group with the
    /// prefix stripped.
    pub fn mount_group<F, I>(
        mut self,
        prefix: &str,
        register: F,
        middlewares: I,
    ) -> Result<Self, RouteError>
    where
        F: FnOnce(&mut RouteGroup<S>) -> Result<(), RouteError>,
        I: IntoIterator<Item = Middleware>,
    {
        validate_prefix(prefix)?;

        let clash = self
            .prefixes
            .iter()
            .find(|existing| overlaps(existing, prefix) || overlaps(prefix, existing))
            .or_else(|| self.routes.iter().find(|route| overlaps(prefix, route)));
        if let Some(existing) = clash {
            return Err(RouteError::PrefixConflict {
                path: prefix.to_string(),
                existing: existing.clone(),
            });
        }

        let mut group = RouteGroup::new(prefix);
        register(&mut group)?;

        let middlewares: Vec<Middleware> = middlewares.into_iter().collect();
        tracing::debug!(
            prefix = group.prefix(),
            routes = ?group.paths().collect::<Vec<_>>(),
            middlewares = ?middlewares.iter().map(Middleware::name).collect::<Vec<_>>(),
            "mounting route group"
        );

        let RouteGroup { router, paths, .. } = group;
        let inner: Router = router
            .fallback(handlers::not_found)
            .with_state(self.state.clone());
        let wrapped = chain(Handler::new(inner), &middlewares);

        self.router = self.router.nest_service(prefix, wrapped);
        self.prefixes.push(prefix.to_string());
        self.routes.extend(paths);
        Ok(self)
    }

    /// Every registered full path, sorted. Independent of registration order.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(String::as_str)
    }

    /// Freezes the table. Unmatched paths outside every group get a JSON 404.
    pub fn into_router(self) -> Router {
        self.router
            .fallback(handlers::not_found)
            .with_state(self.state)
    }
}

/// True when `path` is `prefix` itself or lies below it segment-wise.
fn overlaps(prefix: &str, path: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Captures, wildcards, or old-style `:param` segments. axum panics on the
/// latter, so they must be caught here.
fn has_parameters(path: &str) -> bool {
    path.contains(['{', '}', '*']) || path.split('/').any(|segment| segment.starts_with(':'))
}

fn validate_prefix(prefix: &str) -> Result<(), RouteError> {
    let reason = if !prefix.starts_with('/') {
        Some("must start with `/`")
    } else if prefix == "/" {
        Some("must not be the root path")
    } else if prefix.ends_with('/') {
        Some("must not end with `/`")
    } else if prefix.contains("//") {
        Some("must not contain empty segments")
    } else if has_parameters(prefix) {
        Some("path parameters and wildcards are not supported")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RouteError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn validate_path(path: &str) -> Result<(), RouteError> {
    let reason = if !path.starts_with('/') {
        Some("must start with `/`")
    } else if has_parameters(path) {
        Some("path parameters and wildcards are not supported")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RouteError::InvalidPath {
            path: path.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
