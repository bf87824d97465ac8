//! # Decorators
//!
//! Encrypting outbox/inbox decorators: an `OutboxStore`/`InboxStore`
//! wrapper that encrypts on write and decrypts on read according to an
//! `EncryptionMode`, with an opportunistic re-encryption ("lazy migration")
//! path on the read side for payloads still under a legacy provider.

pub mod inbox;
pub mod mode;
pub mod outbox;

pub use inbox::EncryptingInboxDecorator;
pub use mode::{DecoratorOptions, EncryptionMode, LazyMigrationMode};
pub use outbox::EncryptingOutboxDecorator;
