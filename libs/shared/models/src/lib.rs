pub mod appointment;
pub mod auth;
pub mod clinic;
pub mod error;

/// Soft-delete visibility shared by every persisted entity.
///
/// Store read paths filter with [`SoftDelete::is_visible`] instead of
/// checking the individual flags.
pub trait SoftDelete {
    fn is_deleted(&self) -> bool;

    fn is_visible(&self) -> bool {
        !self.is_deleted()
    }
}
