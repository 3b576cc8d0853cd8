//! Access-control decisions.
//!
//! Pure functions over the caller identity and the claimed target; nothing
//! here touches storage. Callers evaluate these gates before any repository
//! lookup, so an unauthorized caller learns nothing about whether the target
//! exists.

use crate::domain::user::models::Identity;
use crate::domain::user::models::UserId;

/// Read, update, or delete a specific user record: admin or owner.
pub fn can_access_user(caller: &Identity, target: &UserId) -> bool {
    caller.role.is_admin() || caller.id == *target
}

/// List all users: admin only.
pub fn can_list_users(caller: &Identity) -> bool {
    caller.role.is_admin()
}

/// Create accounts with an explicit role: admin only.
pub fn can_create_users(caller: &Identity) -> bool {
    caller.role.is_admin()
}

/// Change any record's role, including the caller's own: admin only.
pub fn can_change_role(caller: &Identity) -> bool {
    caller.role.is_admin()
}
