pub mod chunking;
pub mod error;
pub mod service;

pub use chunking::{chunk_text, truncate_to_sentence, CHUNK_THRESHOLD};
pub use error::SynthesisError;
pub use service::SpeechService;
