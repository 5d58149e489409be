pub mod parser;
pub mod types;

pub use parser::{parse_photodiode_fields, parse_reference_line};
pub use types::{AlignedObservation, Sample};
