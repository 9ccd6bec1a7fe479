use std::collections::HashMap;

use twilight_model::id::{Id, marker::RoleMarker};

/// Level of an invoker with no guild member record (direct messages).
pub const BASE_LEVEL: i32 = 50;
/// Level granted by any guild role that carries no configured admin level.
pub const MEMBER_ROLE_LEVEL: i32 = 100;

/// Resolve an invoker's access level from their guild roles.
///
/// `None` means the message carried no member record. Every role counts:
/// configured admin roles contribute their level, others contribute
/// [`MEMBER_ROLE_LEVEL`]. The highest contribution wins.
pub fn resolve_user_level(
    member_roles: Option<&[Id<RoleMarker>]>,
    admin_roles: &HashMap<Id<RoleMarker>, i32>,
) -> i32 {
    let Some(roles) = member_roles else {
        return BASE_LEVEL;
    };

    roles
        .iter()
        .map(|role| admin_roles.get(role).copied().unwrap_or(MEMBER_ROLE_LEVEL))
        .fold(BASE_LEVEL, i32::max)
}
