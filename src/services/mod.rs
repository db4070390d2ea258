pub mod clip_engine;
pub mod prune;
pub mod settings;
pub mod snippets;
