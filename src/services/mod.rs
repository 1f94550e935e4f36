pub mod document_store;
pub mod field_parser;
pub mod ocr;
pub mod processor;
pub mod registry;
pub mod state;
pub mod text_extraction;
pub mod validity;
