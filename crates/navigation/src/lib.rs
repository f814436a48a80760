pub mod controller;
pub mod dispatcher;
pub mod extract;
pub mod url;

pub use controller::{NavigationController, Visit, WELCOME_CONTEXT};
pub use dispatcher::{classify, CommandKind};
pub use extract::{ContextExtractor, HttpPageReader, PageReader};
