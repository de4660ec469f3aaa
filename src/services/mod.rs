pub mod intent;
pub mod lifecycle;
pub mod normalizer;
pub mod prompts;
pub mod voice;
