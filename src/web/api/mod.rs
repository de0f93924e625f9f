pub mod error;
pub mod scan;
