//! User model types.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoleKind
// ---------------------------------------------------------------------------

/// A role a user can hold.
///
/// The numeric storage identifier exists only for store backends whose role
/// tables are keyed by id; the core always works with the enum value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleKind {
    Admin,
    User,
}

impl RoleKind {
    /// The identifier a store backend keys this role under.
    pub fn storage_id(self) -> i32 {
        match self {
            Self::Admin => 1,
            Self::User => 2,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::User => write!(f, "USER"),
        }
    }
}

/// The given token does not name a role.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("the role \"{0}\" does not exist")]
pub struct UnknownRole(pub String);

impl FromStr for RoleKind {
    type Err = UnknownRole;

    /// Accepts exactly the uppercase wire tokens `ADMIN` and `USER`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// UserId / User
// ---------------------------------------------------------------------------

/// A unique identifier for a user record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A user record: credentials, display name, and held roles.
///
/// Roles are a true set — adding a role the user already holds and removing
/// one they don't are both no-ops, and iteration order is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub password: String,
    pub display_name: String,
    pub roles: BTreeSet<RoleKind>,
}

/// A shared handle to a mutable user record.
///
/// A session holds this handle rather than a copy, so a rename or role
/// change is visible to everyone reading the session's identity without a
/// fresh store lookup.
pub type SharedUser = Arc<RwLock<User>>;

impl User {
    /// Creates a user record.
    pub fn new(
        id: UserId,
        login: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
        roles: impl IntoIterator<Item = RoleKind>,
    ) -> Self {
        Self {
            id,
            login: login.into(),
            password: password.into(),
            display_name: display_name.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Wraps this record in the shared mutable handle sessions hold.
    pub fn into_shared(self) -> SharedUser {
        Arc::new(RwLock::new(self))
    }

    /// Whether this user holds the admin role (anywhere in the set).
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&RoleKind::Admin)
    }

    /// Renders the role set for client-facing replies, e.g. `ADMIN, USER`.
    pub fn roles_line(&self) -> String {
        let names: Vec<String> =
            self.roles.iter().map(RoleKind::to_string).collect();
        names.join(", ")
    }
}
