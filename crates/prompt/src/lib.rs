//! Domain types, prompt-version registry, prompt assembler, and the
//! compact schema codec (spec §3, §4.2, §4.3 — components C2/C3).

pub mod assembler;
pub mod codec;
pub mod extract;
pub mod registry;
pub mod schema;
pub mod types;

pub use assembler::{PromptAssembler, ReplyPromptInputs};
pub use extract::{extract_json, ExtractError};
pub use registry::{ActivationOutcome, PromptRegistry, PromptVersionMeta};
pub use types::*;
