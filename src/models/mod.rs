pub mod messages;
pub mod health;
pub mod session;
pub mod document;
pub mod doc_export;
pub mod diagnostics;
pub mod error;

pub use messages::Message;
pub use health::*;
pub use session::*;
pub use document::*;
pub use doc_export::*;
pub use diagnostics::*;
pub use error::*;
