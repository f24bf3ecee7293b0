pub mod interface;
pub mod client;
pub mod factory;

pub use interface::{SpeechError, SpeechRequest, SpeechResponse, SpeechSynthesizer};
pub use client::GeminiSpeechClient;
pub use factory::SpeechFactory;
