mod connection;
mod extract;
mod helper;
mod sql_writer;

pub use connection::*;
pub use helper::*;
pub use sql_writer::*;
