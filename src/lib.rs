pub mod codec;
pub mod error;
pub mod header;
pub mod info;
pub(crate) mod parser;
pub mod reader;
pub mod record;
pub mod types;
pub mod writer;

pub use error::{Decoded, ErrorAggregator, VcfError};
pub use header::{Header, SharedHeader};
pub use info::InfoStore;
pub use reader::{ReaderOptions, VcfReader};
pub use record::{split_alts, Record, SampleGenotype, Variant};
pub use writer::VcfWriter;
