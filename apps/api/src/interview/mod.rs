// Interview core: context, stage selection, templates, the session controller
// and its HTTP surface.

pub mod context;
pub mod handlers;
pub mod prompt_config;
pub mod prompts;
pub mod session;
pub mod stage;
pub mod store;
pub mod templates;
