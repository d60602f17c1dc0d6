use crate::auth::PermissionLevel;
use crate::database::models::Role;

/// Every `entity:action` pair a handler may check.
const ACTIONS: &[(&str, &[&str])] = &[
    ("users", &["list", "get", "create", "update", "delete"]),
    ("countries", &["list", "get", "create", "update", "delete"]),
    ("states", &["list", "get", "create", "update", "delete"]),
    (
        "individuals",
        &["list", "get", "create", "create_with_user", "update", "change_status", "delete"],
    ),
];

/// Per-role exceptions to [`Role::permission_level`].
const OVERRIDES: &[(Role, &str, &str, PermissionLevel)] = &[
    // Reference geography is edited by managers and above.
    (Role::Collaborator, "countries", "update", PermissionLevel::Read),
    (Role::Collaborator, "states", "update", PermissionLevel::Read),
    // Guests may browse reference geography.
    (Role::Guest, "countries", "list", PermissionLevel::Read),
    (Role::Guest, "countries", "get", PermissionLevel::Read),
    (Role::Guest, "states", "list", PermissionLevel::Read),
    (Role::Guest, "states", "get", PermissionLevel::Read),
];

/// The level `role` holds for `entity:action`, or `None` when no such
/// permission is configured.
pub fn level_for(role: Role, entity: &str, action: &str) -> Option<PermissionLevel> {
    let known = ACTIONS
        .iter()
        .any(|(name, actions)| *name == entity && actions.contains(&action));
    if !known {
        return None;
    }

    let level = OVERRIDES
        .iter()
        .find(|(r, e, a, _)| *r == role && *e == entity && *a == action)
        .map(|(_, _, _, level)| *level)
        .unwrap_or_else(|| role.permission_level());
    Some(level)
}
