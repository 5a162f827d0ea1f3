//! Perspective metadata and sharing policy types.

pub mod handle;
pub mod shared;

pub use handle::{Neighbourhood, Perspective, PerspectiveHandle};
pub use shared::{sharing_type_from_string, LanguageRef, SharedPerspective, SharingType};
