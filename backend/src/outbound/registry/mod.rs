//! Registry dataset adapters.

mod csv_source;

pub use csv_source::CsvRegistrySource;
