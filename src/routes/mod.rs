/// Router Module Index
///
/// Routing is split by access level so the authentication layer is applied per module
/// in `create_router`, never per route.

/// Routes accessible to anonymous readers (read-only, published content only).
pub mod public;

/// Routes for any signed-in staff account, regardless of role.
pub mod authenticated;

/// Back-office routes under `/admin`. Authentication is enforced by the layer; the
/// role checks happen inside the handlers.
pub mod admin;
