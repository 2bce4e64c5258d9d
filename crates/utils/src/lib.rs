pub mod document_number;
pub mod logging;
