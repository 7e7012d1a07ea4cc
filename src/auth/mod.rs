//! Role hierarchy, route policy and the authorization decision

pub mod claims;
pub mod decision;
pub mod identity;
pub mod policy;
pub mod roles;
pub mod tier;

pub use claims::{generate_jwt, validate_jwt, Claims, ClaimsError};
pub use decision::{Authorizer, AuthzError, Decision, Route};
pub use identity::{Identity, IdentityProvider, JwtIdentityProvider};
pub use policy::{PolicyDocument, PolicyError, RouteAuthPolicy, RouteRule};
pub use roles::RoleHierarchy;
pub use tier::{ElevationTier, TierTtls};
