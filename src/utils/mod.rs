pub mod archive;
pub mod command;
pub mod template;

// Trait-based abstractions for testability
pub mod executor;

// Re-export commonly used types and traits (used by test crate)
pub use archive::{Archiver, StagingDir};
pub use command::Invocation;
pub use executor::{CommandExecutor, RealExecutor};
pub use template::{Clock, FixedClock, NameTemplate, SystemClock, TemplateError};
