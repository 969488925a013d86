pub mod parse;
pub mod processor;

pub use parse::{decode_line, parse_event_line, ParseError};
pub use processor::{EventPipeline, LineOutcome, Mode, PipelineError, RunReport};
