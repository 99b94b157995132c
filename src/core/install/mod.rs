pub mod backend;
pub mod pipeline;
pub mod vanilla;

pub use backend::{InstallBackend, InstallObserver};
pub use pipeline::{InstallHandle, InstallPipeline};
pub use vanilla::VanillaBackend;
