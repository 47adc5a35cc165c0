//! CSV ingestion and run-artifact emission for the quercus pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{RunName, TabularData};
pub use error::IoError;
pub use reader::TabularReader;
pub use writer::RunWriter;
