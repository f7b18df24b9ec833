pub mod health;
pub mod user_sessions;
pub mod doc_save;
pub mod doc_export;
pub mod diagnostics;

pub use health::*;
pub use user_sessions::*;
pub use doc_save::*;
pub use doc_export::*;
pub use diagnostics::*;

#[cfg(test)]
mod tests;
