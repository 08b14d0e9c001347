pub mod bits;
pub mod config;
pub mod error;
pub mod factory;
pub mod grouping;
pub mod pgen;
pub mod pvar;
pub mod record;
pub mod row;
pub mod track;
pub mod values;
pub mod writer;

pub use config::{ColumnLayout, WriterConfig};
pub use error::PgenError;
pub use pgen::{PgenMode, PgenOutputStream, PgenSummary};
pub use writer::{GenotypeWriter, open_writer};
