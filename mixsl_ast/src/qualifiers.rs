//! Storage qualifiers attached to declarations

use bitflags::bitflags;

bitflags! {
    /// Storage qualifiers a shader class declaration may carry
    ///
    /// Some of these are meaningful to the downstream native compiler
    /// (const, static, groupshared); the rest drive mixing and are
    /// stripped from the emitted tree by the cleaner.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct StorageQualifiers: u16 {
        /// Compile-time constant
        const CONST = 1 << 0;

        /// Static (class-level) storage
        const STATIC = 1 << 1;

        /// Per-vertex stream variable, flows between pipeline stages
        const STREAM = 1 << 2;

        /// Composition slot shared across every reference within one compile
        const STAGE = 1 << 3;

        /// Composition slot, filled at mix time by another class
        const COMPOSE = 1 << 4;

        /// Per-control-point stream for the tessellation stages
        const PATCH_STREAM = 1 << 5;

        /// Replaces a same-named declaration from a base class
        const OVERRIDE = 1 << 6;

        /// Method body is duplicated per composition site instead of shared
        const CLONE = 1 << 7;

        /// Thread-group shared memory (compute)
        const GROUPSHARED = 1 << 8;
    }
}

impl StorageQualifiers {
    /// Qualifiers that only have meaning inside this compiler and must not
    /// reach the emitted tree.
    pub const INTERNAL: StorageQualifiers = StorageQualifiers::STREAM
        .union(StorageQualifiers::STAGE)
        .union(StorageQualifiers::COMPOSE)
        .union(StorageQualifiers::PATCH_STREAM)
        .union(StorageQualifiers::OVERRIDE)
        .union(StorageQualifiers::CLONE);

    /// Returns true if this set marks a composition slot.
    pub fn is_compose(&self) -> bool {
        self.contains(StorageQualifiers::COMPOSE)
    }

    /// Returns true if this set marks a shared (stage) composition slot.
    pub fn is_stage_compose(&self) -> bool {
        self.contains(StorageQualifiers::COMPOSE | StorageQualifiers::STAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifiers_combine() {
        let q = StorageQualifiers::COMPOSE | StorageQualifiers::STAGE;
        assert!(q.is_compose());
        assert!(q.is_stage_compose());
        assert!(!q.contains(StorageQualifiers::STREAM));
    }

    #[test]
    fn test_internal_set() {
        assert!(StorageQualifiers::INTERNAL.contains(StorageQualifiers::OVERRIDE));
        assert!(!StorageQualifiers::INTERNAL.contains(StorageQualifiers::GROUPSHARED));
        assert!(!StorageQualifiers::INTERNAL.contains(StorageQualifiers::CONST));
    }
}
