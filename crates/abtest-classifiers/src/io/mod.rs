pub mod delimited;

pub use delimited::{read_delimited, read_delimited_from_reader};
