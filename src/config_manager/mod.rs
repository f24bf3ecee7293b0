pub mod main;
pub mod speech;
pub mod system;
pub mod utils;

pub use main::Config;
pub use speech::SpeechConfig;
pub use system::SystemConfig;
