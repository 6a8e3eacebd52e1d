//! Remote object gateway
//!
//! The execution layer never talks to a member cluster directly. It reads
//! current remote state through an [`ObjectCache`] and writes through an
//! [`ObjectWatcher`], so the remote-apply strategy can be swapped or faked.

mod memory;
mod traits;

pub use memory::InMemoryMemberClusters;
pub use traits::{FederatedKey, GatewayError, ObjectCache, ObjectWatcher};
