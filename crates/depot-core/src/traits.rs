//! Core entity traits shared across the workspace

use chrono::{DateTime, Utc};

/// Trait for entities carrying an opaque string identifier
pub trait Identifiable {
    fn id(&self) -> Option<&str>;

    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }

    fn is_new_record(&self) -> bool {
        !self.is_persisted()
    }
}

/// Trait for entities with a creation timestamp
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}
