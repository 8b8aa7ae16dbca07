pub mod catalog;
pub mod compiler;
pub mod context;
pub mod error;
pub mod inject;
pub mod relationship;
pub mod settings;
pub mod store;
pub mod template;

pub use catalog::{Trait, TraitEdit, TraitGroup, TraitKind};
pub use compiler::compile;
pub use context::AppContext;
pub use error::{CoreError, Result};
pub use inject::{on_message_sent, Injection, InjectionRegistry, PromptSink};
pub use relationship::{RelationshipBook, RelationshipKind, RelationshipRecord};
pub use settings::{PanelPosition, Settings};
pub use store::{JsonFileStore, MemoryStore, StoreKey, ValueStore};
