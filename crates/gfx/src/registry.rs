use crate::handle::TextureHandle;
use std::collections::{BTreeMap, HashMap};

/// Per-owner live-texture statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerStats {
    pub count: usize,
    pub bytes: u64,
}

/// Ledger of live GPU textures, tagged by owner, for leak detection and
/// VRAM accounting. Constructed once at application scope and passed by
/// reference to every component that allocates textures.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    live: HashMap<u64, (&'static str, u64)>,
    owners: BTreeMap<&'static str, OwnerStats>,
    total_bytes: u64,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a texture as live under the given owner tag. Re-registering a
    /// known id is a non-fatal warning and changes nothing.
    pub fn register(&mut self, handle: &TextureHandle, owner: &'static str) {
        if self.live.contains_key(&handle.id) {
            tracing::warn!(id = handle.id, owner, "texture registered twice");
            return;
        }
        let bytes = handle.estimated_bytes();
        self.live.insert(handle.id, (owner, bytes));
        let stats = self.owners.entry(owner).or_default();
        stats.count += 1;
        stats.bytes += bytes;
        self.total_bytes += bytes;
    }

    /// Remove a texture from the ledger. Idempotent: unknown or already
    /// removed ids are a silent no-op.
    pub fn unregister(&mut self, handle: &TextureHandle) {
        let Some((owner, bytes)) = self.live.remove(&handle.id) else {
            return;
        };
        self.total_bytes -= bytes;
        if let Some(stats) = self.owners.get_mut(owner) {
            stats.count -= 1;
            stats.bytes -= bytes;
            if stats.count == 0 {
                self.owners.remove(owner);
            }
        }
    }

    /// Drop all bookkeeping. The GPU objects this ledger was tracking are
    /// already invalid once the context is gone.
    pub fn on_context_lost(&mut self) {
        let dropped = self.live.len();
        self.live.clear();
        self.owners.clear();
        self.total_bytes = 0;
        if dropped > 0 {
            tracing::info!(dropped, "registry reset on context loss");
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn owner_stats(&self, owner: &str) -> OwnerStats {
        self.owners.get(owner).copied().unwrap_or_default()
    }

    pub fn owners(&self) -> impl Iterator<Item = (&&'static str, &OwnerStats)> {
        self.owners.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::TextureOrigin;

    fn handle(id: u64, width: u32) -> TextureHandle {
        TextureHandle {
            id,
            width,
            height: 16,
            origin: TextureOrigin::RenderTarget,
            mip_levels: 1,
        }
    }

    #[test]
    fn live_count_is_registers_minus_unregisters() {
        let mut reg = ResourceRegistry::new();
        let handles: Vec<_> = (0..5).map(|i| handle(i, 16)).collect();
        for h in &handles {
            reg.register(h, "chunks");
        }
        assert_eq!(reg.live_count(), 5);
        for h in handles.iter().take(2) {
            reg.unregister(h);
        }
        assert_eq!(reg.live_count(), 3);
        assert_eq!(reg.owner_stats("chunks").count, 3);
    }

    #[test]
    fn duplicate_register_changes_nothing() {
        let mut reg = ResourceRegistry::new();
        let h = handle(7, 16);
        reg.register(&h, "chunks");
        let before = reg.total_bytes();
        reg.register(&h, "chunks");
        assert_eq!(reg.live_count(), 1);
        assert_eq!(reg.total_bytes(), before);
    }

    #[test]
    fn double_unregister_is_a_silent_noop() {
        let mut reg = ResourceRegistry::new();
        let h = handle(1, 16);
        reg.register(&h, "atlas");
        reg.unregister(&h);
        reg.unregister(&h);
        assert_eq!(reg.live_count(), 0);
        assert_eq!(reg.total_bytes(), 0);
    }

    #[test]
    fn unregister_unknown_is_a_silent_noop() {
        let mut reg = ResourceRegistry::new();
        reg.unregister(&handle(99, 16));
        assert_eq!(reg.live_count(), 0);
    }

    #[test]
    fn owner_totals_track_bytes() {
        let mut reg = ResourceRegistry::new();
        let a = handle(1, 16);
        let b = handle(2, 32);
        reg.register(&a, "chunks");
        reg.register(&b, "atlas");
        assert_eq!(
            reg.total_bytes(),
            a.estimated_bytes() + b.estimated_bytes()
        );
        assert_eq!(reg.owner_stats("atlas").bytes, b.estimated_bytes());

        reg.unregister(&b);
        assert_eq!(reg.owner_stats("atlas"), OwnerStats::default());
        assert_eq!(reg.total_bytes(), a.estimated_bytes());
    }

    #[test]
    fn context_loss_zeroes_unconditionally() {
        let mut reg = ResourceRegistry::new();
        for i in 0..10 {
            reg.register(&handle(i, 16), "chunks");
        }
        reg.on_context_lost();
        assert_eq!(reg.live_count(), 0);
        assert_eq!(reg.total_bytes(), 0);
        assert_eq!(reg.owner_stats("chunks"), OwnerStats::default());
    }
}
