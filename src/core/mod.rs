pub mod feat;
pub mod parse;
