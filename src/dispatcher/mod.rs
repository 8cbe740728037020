pub mod handler;

pub use handler::{CommandExecutor, LocalEvent};
