pub mod blocks;
pub mod cookie;

pub use blocks::split_blocks;
pub use cookie::parse;
