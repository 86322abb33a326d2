mod args;
pub mod render;
pub mod repl;

pub use args::{Cli, Mode};
pub use repl::ReplCommand;
