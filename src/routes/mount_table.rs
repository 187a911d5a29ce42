//! Route mount table: the seven resource groups and their fixed prefixes.
//!
//! Handler bodies for these groups live outside this crate. An embedder
//! supplies a `Router` per group through [`RouteGroups`]; any group left
//! empty answers `501 {"error":"Not implemented"}` under its prefix.

use crate::handlers::fallback_handlers::{not_found, not_implemented};
use axum::Router;

/// A resource route group of the haifriends API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Auth,
    Comments,
    Likes,
    Posts,
    Users,
    Relationships,
    Stories,
}

impl Resource {
    /// Mount order. Prefixes are disjoint, so order does not affect matching.
    pub const ALL: [Resource; 7] = [
        Resource::Auth,
        Resource::Comments,
        Resource::Likes,
        Resource::Posts,
        Resource::Users,
        Resource::Relationships,
        Resource::Stories,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Resource::Auth => "/api/auth",
            Resource::Comments => "/api/comments",
            Resource::Likes => "/api/likes",
            Resource::Posts => "/api/posts",
            Resource::Users => "/api/users",
            Resource::Relationships => "/api/relationships",
            Resource::Stories => "/api/stories",
        }
    }
}

/// Handler sets for the resource groups, fixed once the router is built.
#[derive(Default)]
pub struct RouteGroups {
    groups: Vec<(Resource, Router)>,
}

impl RouteGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handlers for `resource`. Paths inside the router are
    /// relative to the group prefix. A later call for the same resource
    /// replaces the earlier one.
    pub fn with(mut self, resource: Resource, router: Router) -> Self {
        self.groups.retain(|(existing, _)| *existing != resource);
        self.groups.push((resource, router));
        self
    }

    fn take(&mut self, resource: Resource) -> Option<Router> {
        let index = self
            .groups
            .iter()
            .position(|(existing, _)| *existing == resource)?;
        Some(self.groups.swap_remove(index).1)
    }

    /// Nest every group under its prefix on `router`.
    pub fn mount<S>(mut self, mut router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        for resource in Resource::ALL {
            let group = match self.take(resource) {
                Some(group) => group.fallback(not_found),
                None => Router::new().fallback(not_implemented),
            };
            tracing::debug!(prefix = resource.prefix(), "mounting route group");
            router = router.nest_service(resource.prefix(), group);
        }
        router
    }
}
