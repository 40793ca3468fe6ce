pub mod config;
pub(crate) mod env_paths;
pub mod fd_limit;
pub(crate) mod fixity_toml;
pub mod logger;

pub use config::*;
pub use fd_limit::{FDS_PER_WORKER, max_open_fds, max_workers_by_fd_limit};
pub use logger::{Colors, setup_logging};
