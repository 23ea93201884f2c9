//! Role-aware path dispatch.
//!
//! The router is a navigation convenience. Its decisions are advisory: every
//! view it renders fetches data through endpoints that re-check
//! authorization server-side, so a wrong decision here can at worst show an
//! empty or failing view, never leak data.
//!
//! Matching is fail-closed. Paths absent from the table require an
//! authenticated user, and a user whose role is not in the closed set is
//! treated as unauthenticated.

use std::fmt;

use tracing::debug;

use super::{AuthState, Role, User};

/// Who may render the views mounted under a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Anyone, signed in or not.
    Public,
    /// Any user with a recognised role.
    Authenticated,
    /// Only the listed roles.
    Roles(Vec<Role>),
}

impl Access {
    fn permits(&self, role: Role) -> bool {
        match self {
            Self::Public | Self::Authenticated => true,
            Self::Roles(roles) => roles.contains(&role),
        }
    }
}

/// Error returned when a route table cannot back a router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    /// A prefix does not start with `/`.
    InvalidPrefix {
        /// Offending prefix.
        prefix: String,
    },
    /// Two rules normalise to the same prefix.
    DuplicatePrefix {
        /// Normalised prefix.
        prefix: String,
    },
    /// A role would be bounced away from its own dashboard.
    DashboardNotRenderable {
        /// Role whose default route is gated against it.
        role: Role,
    },
}

impl fmt::Display for RouteTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPrefix { prefix } => {
                write!(f, "route prefix '{prefix}' must start with '/'")
            }
            Self::DuplicatePrefix { prefix } => write!(f, "route prefix '{prefix}' is declared twice"),
            Self::DashboardNotRenderable { role } => write!(
                f,
                "default route {} is not renderable for role {role}",
                role.default_route()
            ),
        }
    }
}

impl std::error::Error for RouteTableError {}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteRule {
    segments: Vec<String>,
    raw: String,
    access: Access,
}

/// Ordered set of prefix rules.
///
/// The longest matching prefix wins. Prefixes match whole path segments, so
/// `/admin` covers `/admin/users` but not `/administrator`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// An empty table: every path requires authentication.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table used by the portal front-ends.
    ///
    /// Sign-in pages are public and each role owns the tree under its own
    /// name.
    pub fn portal() -> Self {
        let table = ["/login", "/register", "/forgot-password"]
            .into_iter()
            .fold(Self::new(), |table, prefix| table.with_rule(prefix, Access::Public));
        Role::ALL.into_iter().fold(table, |table, role| {
            table.with_rule(format!("/{}", role.as_str()), Access::Roles(vec![role]))
        })
    }

    /// Append a rule.
    #[must_use]
    pub fn with_rule(mut self, prefix: impl Into<String>, access: Access) -> Self {
        let raw = prefix.into();
        self.rules.push(RouteRule {
            segments: segments(&raw),
            raw,
            access,
        });
        self
    }

    /// Check the table is usable.
    ///
    /// Besides well-formed prefixes, every role's default dashboard must be
    /// renderable by that role; otherwise a redirect to it would loop.
    pub fn validate(&self) -> Result<(), RouteTableError> {
        let mut seen: Vec<&[String]> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !rule.raw.starts_with('/') {
                return Err(RouteTableError::InvalidPrefix {
                    prefix: rule.raw.clone(),
                });
            }
            if seen.contains(&rule.segments.as_slice()) {
                return Err(RouteTableError::DuplicatePrefix {
                    prefix: format!("/{}", rule.segments.join("/")),
                });
            }
            seen.push(rule.segments.as_slice());
        }

        for role in Role::ALL {
            if !self.access_for(role.default_route()).permits(role) {
                return Err(RouteTableError::DashboardNotRenderable { role });
            }
        }
        Ok(())
    }

    fn access_for(&self, path: &str) -> &Access {
        let path = segments(path);
        self.rules
            .iter()
            .filter(|rule| path.starts_with(&rule.segments))
            .max_by_key(|rule| rule.segments.len())
            .map_or(&Access::Authenticated, |rule| &rule.access)
    }
}

fn segments(path: &str) -> Vec<String> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path.get(..end)
        .unwrap_or(path)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}

/// View tree a render decision mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTree {
    /// Pages reachable without a session.
    Public,
    /// The tree owned by a role.
    Role(Role),
}

/// Outcome of resolving a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Mount the given tree.
    Render {
        /// Tree to mount.
        view: ViewTree,
    },
    /// Send the visitor to sign in, then back to `return_to`.
    RedirectToLogin {
        /// Originally requested path.
        return_to: String,
    },
    /// Send the user to their own dashboard.
    RedirectToDashboard {
        /// Dashboard path for the user's role.
        path: &'static str,
    },
    /// The session is still being verified; show a loading state.
    Loading,
}

/// Dispatcher from `(user, path)` to a [`RouteDecision`].
#[derive(Debug, Clone)]
pub struct RoleRouter {
    table: RouteTable,
}

impl RoleRouter {
    /// Build a router over a validated table.
    pub fn new(table: RouteTable) -> Result<Self, RouteTableError> {
        table.validate()?;
        Ok(Self { table })
    }

    /// Resolve a request for a known (or absent) user.
    ///
    /// # Examples
    /// ```
    /// use portal_session::domain::{RoleRouter, RouteDecision, RouteTable, User};
    ///
    /// let router = RoleRouter::new(RouteTable::portal()).unwrap();
    /// let contractor = User::try_from_strings("7", "Cy", "cy@example.com", "contractor").unwrap();
    /// assert_eq!(
    ///     router.resolve(Some(&contractor), "/admin/users"),
    ///     RouteDecision::RedirectToDashboard { path: "/contractor/dashboard" },
    /// );
    /// ```
    pub fn resolve(&self, user: Option<&User>, path: &str) -> RouteDecision {
        let access = self.table.access_for(path);
        let role = user.and_then(|user| user.role().role());

        let decision = match (access, role) {
            (Access::Public, _) => RouteDecision::Render {
                view: ViewTree::Public,
            },
            (_, None) => RouteDecision::RedirectToLogin {
                return_to: path.to_owned(),
            },
            (access, Some(role)) if access.permits(role) => RouteDecision::Render {
                view: ViewTree::Role(role),
            },
            (_, Some(role)) => RouteDecision::RedirectToDashboard {
                path: role.default_route(),
            },
        };
        debug!(path, ?decision, "resolved route");
        decision
    }

    /// Resolve a request against the gate's current state.
    ///
    /// Gated paths answer [`RouteDecision::Loading`] while the start-up check
    /// is outstanding, so no logged-out view flashes before it resolves. The
    /// cached user is never consulted.
    pub fn resolve_for_state(&self, state: &AuthState, path: &str) -> RouteDecision {
        match state {
            AuthState::Initializing { .. } => match self.table.access_for(path) {
                Access::Public => RouteDecision::Render {
                    view: ViewTree::Public,
                },
                Access::Authenticated | Access::Roles(_) => RouteDecision::Loading,
            },
            AuthState::Authenticated(session) => self.resolve(Some(&session.user), path),
            AuthState::Unauthenticated => self.resolve(None, path),
        }
    }
}
