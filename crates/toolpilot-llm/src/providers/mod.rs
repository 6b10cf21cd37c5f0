#[cfg(feature = "openai")]
mod openai;
mod scripted;

#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;
pub use scripted::ScriptedProvider;
