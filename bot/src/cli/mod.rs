pub mod command;
pub mod formatter;
pub mod repl;
