pub mod identity;
pub mod java;
pub mod options;

pub use identity::{offline_uuid, resolve_identity};
pub use java::find_java_executable;
pub use options::{build_launch_options, merge_jvm_args, LaunchOptions};
