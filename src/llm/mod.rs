mod claude;
mod deepseek;
mod provider;
mod types;


pub use claude::ClaudeProvider;
pub use deepseek::DeepSeekProvider;
pub use provider::{create_provider, LlmError, LlmProvider, ProviderKind};

/// Model used to answer questions when none is configured
pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";

/// Upper bound on the length of a generated answer
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const DEEPSEEK_API_KEY_VAR: &str = "DEEPSEEK_API_KEY";
