mod evaluate;
mod helper;
mod select;
mod table;

pub use helper::*;
