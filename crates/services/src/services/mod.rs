pub mod clock;
pub mod config;
pub mod documents;
pub mod numbering;
