//! Role-based permission checks. Pure; the engine itself assumes every request
//! reaching it has already been authorized.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    TenantAdmin,
    TenantManager,
    TenantMember,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewAvailability,
    ManageAvailability,
    CreateBooking,
    ViewBookings,
    ManageBookings,
}

/// Availability is public to read. Managing rules and bookings needs a
/// tenant staff role; members may book and see bookings.
pub fn has_permission(role: Role, action: Action) -> bool {
    use Action::*;
    match role {
        Role::SuperAdmin | Role::TenantAdmin => true,
        Role::TenantManager => true,
        Role::TenantMember => matches!(action, ViewAvailability | CreateBooking | ViewBookings),
        Role::Guest => action == ViewAvailability,
    }
}
