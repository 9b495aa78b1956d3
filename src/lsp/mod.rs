pub mod backend;

pub use backend::{BackendOptions, CREATE_VIEW_COMMAND, NavigatorBackend};
