//! Mention handling for Boxer.
//!
//! Each Slack mention flows through the [`runtime::MentionRouter`], which picks
//! exactly one path in a fixed order:
//! 1. canned per-user replies and `ping`,
//! 2. app-user barcode lookup (`tools`), gated by [`guardrails::AccessPolicy`],
//! 3. read-only DB queries through `boxer-db`,
//! 4. an LLM answer (`llm`) enriched with prior thread messages (`conversation`).
//!
//! Failures never escape the router: every path ends in a reply text.

pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use conversation::{build_model_input, trim_context_lines, ContextLimits, ThreadContextLoader};
pub use guardrails::{AccessDecision, AccessPolicy, GuardedAction};
pub use llm::{AnthropicClient, LlmClient, LlmError, OllamaClient, SYSTEM_PROMPT};
pub use runtime::{LlmRoute, MentionRouter};
pub use tools::{format_lookup_report, AppUserDirectory, HttpAppUserDirectory, LookupError};
