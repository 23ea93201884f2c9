//! Closed role set and the claim wrapper used when decoding server records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role assigned to a principal for the lifetime of a session.
///
/// Changing a role requires re-authentication; nothing in the crate mutates
/// the role of a resolved [`crate::domain::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Portal operator; the only role that receives live notifications.
    Admin,
    /// Contractor registered with the portal.
    Contractor,
    /// Coordinator working between customers and contractors.
    Coordinator,
    /// Customer of the portal.
    Customer,
    /// Technician registered with the portal.
    Technician,
    /// Accounting staff.
    Accountant,
    /// Account with no specialised area.
    Member,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Admin,
        Self::Contractor,
        Self::Coordinator,
        Self::Customer,
        Self::Technician,
        Self::Accountant,
        Self::Member,
    ];

    /// Wire name used by the identity API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Contractor => "contractor",
            Self::Coordinator => "coordinator",
            Self::Customer => "customer",
            Self::Technician => "technician",
            Self::Accountant => "accountant",
            Self::Member => "member",
        }
    }

    /// Path of the dashboard a user with this role lands on.
    pub const fn default_route(self) -> &'static str {
        match self {
            Self::Admin => "/admin/dashboard",
            Self::Contractor => "/contractor/dashboard",
            Self::Coordinator => "/coordinator/dashboard",
            Self::Customer => "/customer/dashboard",
            Self::Technician => "/technician/dashboard",
            Self::Accountant => "/accountant/dashboard",
            Self::Member => "/member/dashboard",
        }
    }

    /// Whether sessions with this role open the notification channel.
    pub const fn receives_notifications(self) -> bool {
        match self {
            Self::Admin => true,
            Self::Contractor
            | Self::Coordinator
            | Self::Customer
            | Self::Technician
            | Self::Accountant
            | Self::Member => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(value.to_owned()))
    }
}

/// Role as reported by the server.
///
/// Unrecognised values are kept rather than rejected so the user record
/// still decodes; routing treats them as unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleClaim {
    /// A role from the closed set.
    Known(Role),
    /// Anything else, kept verbatim.
    Unrecognized(String),
}

impl RoleClaim {
    /// The known role, if any.
    pub const fn role(&self) -> Option<Role> {
        match self {
            Self::Known(role) => Some(*role),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<Role> for RoleClaim {
    fn from(value: Role) -> Self {
        Self::Known(value)
    }
}

impl From<String> for RoleClaim {
    fn from(value: String) -> Self {
        value
            .parse::<Role>()
            .map_or(Self::Unrecognized(value), Self::Known)
    }
}

impl From<RoleClaim> for String {
    fn from(value: RoleClaim) -> Self {
        match value {
            RoleClaim::Known(role) => role.as_str().to_owned(),
            RoleClaim::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for RoleClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(role) => role.fmt(f),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("admin", Role::Admin)]
    #[case("Contractor", Role::Contractor)]
    #[case(" member ", Role::Member)]
    fn parses_known_roles(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(raw.parse::<Role>(), Ok(expected));
    }

    #[test]
    fn every_role_round_trips_through_its_wire_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn all_lists_each_role_once() {
        let distinct: std::collections::BTreeSet<_> = Role::ALL.into_iter().collect();
        assert_eq!(distinct.len(), Role::ALL.len());
    }

    #[test]
    fn default_routes_live_under_the_role_prefix() {
        for role in Role::ALL {
            let prefix = format!("/{}/", role.as_str());
            assert!(
                role.default_route().starts_with(&prefix),
                "{role} dashboard should sit under {prefix}"
            );
        }
    }

    #[test]
    fn only_admin_receives_notifications() {
        let privileged: Vec<_> = Role::ALL
            .into_iter()
            .filter(|role| role.receives_notifications())
            .collect();
        assert_eq!(privileged, vec![Role::Admin]);
    }

    #[test]
    fn unknown_claims_are_kept_verbatim() {
        let claim: RoleClaim = serde_json::from_str("\"superuser\"").expect("claim decodes");
        assert_eq!(claim, RoleClaim::Unrecognized("superuser".to_owned()));
        assert_eq!(claim.role(), None);
        let encoded = serde_json::to_string(&claim).expect("claim encodes");
        assert_eq!(encoded, "\"superuser\"");
    }
}
