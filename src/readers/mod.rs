pub mod catalog_reader;
pub mod record_reader;

pub use catalog_reader::CatalogReader;
pub use record_reader::RecordParser;
