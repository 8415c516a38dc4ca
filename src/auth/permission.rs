use super::Role;

/// Ownership-or-admin rule, applied uniformly across the API.
///
/// A caller may act on a resource iff they own it or hold the admin role.
/// Pure and total; route handlers translate `false` into a 403.
pub fn has_permission(caller_id: &str, resource_owner_id: &str, caller_role: Role) -> bool {
    caller_role == Role::Admin || caller_id == resource_owner_id
}
