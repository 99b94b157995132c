pub mod catalog;
pub mod manifest;

pub use catalog::{
    display_label, installed_versions, is_version_installed, resolve_selection, VersionCatalog,
    VersionEntry,
};
pub use manifest::{RemoteVersion, VersionKind, VersionManifest};
