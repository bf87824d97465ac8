//! Mode and lazy-migration options shared by both decorators.

/// Governs how a decorator treats payloads crossing the store boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionMode {
    /// Pass every payload through unchanged, in both directions.
    Disabled,
    /// Outbox encrypts on write, inbox decrypts on read.
    EncryptAndDecrypt,
    /// Inbox still decrypts on read; outbox refuses mutating writes.
    DecryptOnlyReadOnly,
}

/// Which side of an access opportunistically re-encrypts an already-stored
/// payload under the current primary provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LazyMigrationMode {
    /// Recompute the upgraded ciphertext for the caller but don't persist it.
    Read,
    /// Persist the upgraded ciphertext back to the store.
    Write,
    /// Recompute and persist.
    Both,
}

impl LazyMigrationMode {
    fn eligible_to_rewrap(self) -> bool {
        matches!(self, LazyMigrationMode::Read | LazyMigrationMode::Both)
    }

    fn should_persist(self) -> bool {
        matches!(self, LazyMigrationMode::Write | LazyMigrationMode::Both)
    }
}

/// Shared decorator configuration.
#[derive(Clone, Debug)]
pub struct DecoratorOptions {
    pub mode: EncryptionMode,
    pub lazy_migration_enabled: bool,
    pub lazy_migration_mode: LazyMigrationMode,
}

impl Default for DecoratorOptions {
    fn default() -> Self {
        Self {
            mode: EncryptionMode::EncryptAndDecrypt,
            lazy_migration_enabled: false,
            lazy_migration_mode: LazyMigrationMode::Both,
        }
    }
}

impl DecoratorOptions {
    pub(crate) fn rewrap_eligible(&self) -> bool {
        self.lazy_migration_enabled && self.lazy_migration_mode.eligible_to_rewrap()
    }

    pub(crate) fn should_persist_rewrap(&self) -> bool {
        self.lazy_migration_enabled && self.lazy_migration_mode.should_persist()
    }
}
