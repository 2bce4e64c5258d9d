pub mod adjustment;
pub mod delivery;
pub mod document;
pub mod document_number;
pub mod product;
pub mod receipt;
pub mod stock_level;
pub mod transfer;
pub mod warehouse;
