pub mod capability;
pub mod error;
pub mod executor;
pub mod extract;
pub mod prompts;
pub mod types;

pub use capability::StageCapability;
pub use error::{AgentError, AgentResult};
pub use executor::{AgentExecutor, AgentOutput};
pub use types::{ParsedOutput, StageContext, StageInput};
