pub mod registry;

pub use registry::{ShareRegistry, MAX_WORKSPACE_SHARES};
