/// Router Module Index
///
/// Routes are split by audience. Access control for the back office is applied
/// twice: the path guard layered over the whole router, and the `AdminSession`
/// extractor in every admin handler.

/// Storefront, session and tracking endpoints open to anonymous clients.
pub mod public;

/// Back-office endpoints, nested under `/admin`.
pub mod admin;
