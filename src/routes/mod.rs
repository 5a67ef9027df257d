/// Router Module Index
///
/// Organizes the application's routing into the three surfaces the service
/// exposes. Access control itself is declared per operation through the
/// `Guard`/`OptionalAuthUser` extractors in each handler's signature; the
/// modules group routes by URL prefix, mirroring the service's three
/// sub-APIs.

/// Health probe and the /auth endpoints (register, login, profile).
pub mod public;

/// The /queries endpoints: public listings, student and faculty operations,
/// and the query console's admin sub-paths.
pub mod queries;

/// The /admin endpoints: account oversight (overview, users, role changes,
/// deletion).
pub mod admin;
