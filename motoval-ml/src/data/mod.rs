//! Data layer — in-memory frames, CSV I/O, schema inference and the listing cleaner.

pub mod clean;
pub mod frame;
pub mod schema;

pub use clean::{Cleaner, CleaningReport, FieldStats};
pub use frame::{Cell, Frame};
pub use schema::{ColumnType, SchemaDefinition, columns};
