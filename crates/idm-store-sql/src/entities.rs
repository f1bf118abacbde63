//! Database row types.

use sqlx::FromRow;

/// Row of `idm_users`.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    /// Surrogate id (insertion order).
    pub id: i64,
    /// Unique key.
    pub name: String,
    /// Full name.
    pub full_name: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Enabled flag.
    pub enabled: bool,
}

/// Row of `idm_groups`.
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    /// Surrogate id (insertion order).
    pub id: i64,
    /// Unique name.
    pub name: String,
    /// Parent group name.
    pub parent: Option<String>,
}

/// Row of `idm_roles`.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    /// Surrogate id (insertion order).
    pub id: i64,
    /// Unique name.
    pub name: String,
}

/// Row of `idm_memberships`.
#[derive(Debug, Clone, FromRow)]
pub struct MembershipRow {
    /// Surrogate id (insertion order).
    pub id: i64,
    /// Role key.
    pub role_name: String,
    /// User key.
    pub user_name: String,
    /// Group key.
    pub group_name: String,
}

/// Row of `idm_attributes`.
#[derive(Debug, Clone, FromRow)]
pub struct AttributeRow {
    /// Key of the owning entity.
    pub owner_key: String,
    /// Attribute name.
    pub name: String,
    /// Value position; `-1` marks an empty value list.
    pub position: i64,
    /// Value, `NULL` for the empty-list marker.
    pub value: Option<String>,
}

/// Kind of entity owning an attribute row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    /// A user.
    User,
    /// A group.
    Group,
    /// A role.
    Role,
}

impl OwnerKind {
    /// Value stored in `owner_kind`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Role => "role",
        }
    }

    /// Entity name used in errors.
    #[must_use]
    pub const fn entity_type(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Role => "Role",
        }
    }

    /// Table holding entities of this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::User => "idm_users",
            Self::Group => "idm_groups",
            Self::Role => "idm_roles",
        }
    }
}

/// Position written for the empty-list marker row.
pub const EMPTY_LIST_POSITION: i64 = -1;
