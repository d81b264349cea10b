//! Bearer challenge discovery: attribute extraction, authority keys, parameters, and the cache.
//!
//! A vault answers an unauthenticated request with
//! `WWW-Authenticate: Bearer authorization="<authority>/<tenant>", resource="<resource>"`. The
//! helpers here turn that header into [`ChallengeParameters`] and remember them per
//! [`authority_key`] in a [`ChallengeCache`] shared by every policy in the process.

pub mod attributes;
pub mod authority;
pub mod cache;
pub mod parameters;

pub use attributes::*;
pub use authority::*;
pub use cache::*;
pub use parameters::*;
