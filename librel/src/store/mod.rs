//! Content store capability.
//!
//! Discovery reads from a store: either a remote registry repository or a
//! local OCI image layout. Both expose the same capability so the engine
//! never branches on where content lives.

use crate::error::Result;
use crate::oci::Descriptor;
use async_trait::async_trait;

pub mod layout;
pub mod memory;
pub mod remote;

pub use layout::OciLayoutStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// Read access to manifests and their referrers.
#[async_trait]
pub trait Store: Send + Sync {
    /// Human-readable locator of this store, used in messages.
    fn locator(&self) -> &str;

    /// Resolves a tag or digest to a manifest descriptor.
    async fn resolve(&self, identifier: &str) -> Result<Descriptor>;

    /// Resolves a tag to a manifest descriptor.
    ///
    /// Used by the referrers tag fallback.
    async fn resolve_tag(&self, tag: &str) -> Result<Descriptor> {
        self.resolve(tag).await
    }

    /// Lists manifests whose subject is `subject`.
    ///
    /// Returns `RelError::Unsupported` when the store has no native
    /// referrers capability.
    async fn referrers(&self, subject: &Descriptor) -> Result<Vec<Descriptor>>;

    /// Fetches the raw content of a manifest.
    async fn fetch_manifest(&self, descriptor: &Descriptor) -> Result<Vec<u8>>;

    /// Returns true if referrer listings come back in a stable order.
    fn preserves_order(&self) -> bool {
        false
    }
}
