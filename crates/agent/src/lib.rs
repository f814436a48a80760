pub mod conversation;
pub mod orchestrator;
pub mod prompt;
pub mod session;

pub use conversation::{Conversation, SharedConversation};
pub use orchestrator::{AgentOrchestrator, OrchestratorSettings, SendOutcome};
pub use session::{BrowserSession, CommandOutcome, SessionEvent, SessionStores};
