//! Admin gate: classification of a visitor into a terminal access state.
//!
//! The decision is a pure function of the session lookup and the role
//! lookup so callers (middleware, tests, future tooling) can share one
//! implementation. Callers re-run the check per request; nothing here is
//! cached.

use uuid::Uuid;

/// Why an authenticated visitor was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The role lookup succeeded but found no admin assignment.
    MissingRole,
    /// The role lookup itself failed. Treated exactly like a missing role;
    /// the distinction exists only for logging.
    LookupFailed,
}

/// Marker for a failed role lookup. Carries no detail because the access
/// decision does not depend on why the lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleLookupFailed;

/// Terminal access states for one guarded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAccess {
    /// No session: the visitor must sign in first.
    Unauthenticated,
    /// Signed in but not an admin (or unverifiable as one).
    Forbidden(DenyReason),
    /// Signed in with the admin role; protected content may be served.
    Authorized,
}

/// Classifies a visitor. Protected content may be served only for
/// [`AdminAccess::Authorized`].
#[must_use]
pub fn evaluate_admin_access(
    session_user: Option<Uuid>,
    has_admin_role: Result<bool, RoleLookupFailed>,
) -> AdminAccess {
    if session_user.is_none() {
        return AdminAccess::Unauthenticated;
    }
    match has_admin_role {
        Ok(true) => AdminAccess::Authorized,
        Ok(false) => AdminAccess::Forbidden(DenyReason::MissingRole),
        Err(RoleLookupFailed) => AdminAccess::Forbidden(DenyReason::LookupFailed),
    }
}
