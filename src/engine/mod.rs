//! Engine: CLI handling, hashing, metadata helpers, progress, and the store.

pub mod arg_parser;
pub mod cli;
pub mod db_ops;
pub mod hashing;
pub mod progress;
pub mod tools;

pub use arg_parser::Cli;
pub use cli::handle_run;
pub use db_ops::{BaselineStore, PersistParams, Persister, SqliteStore, persist_stream};
pub use hashing::hash_file;
pub use tools::{check_root_and_canonicalize, running_as_root};
