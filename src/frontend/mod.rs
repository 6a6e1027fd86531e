pub mod builtins;
pub mod directory;
pub mod eval;
pub mod expand;
pub mod meta;
pub mod module;
pub mod scope;
pub mod source;

// Re-export commonly used items for convenience
pub use builtins::create_context;
pub use directory::Resolver;
pub use eval::Evaluator;
pub use meta::{IdGenerator, InstanceKey, ModulePath, ID_KEY, META_KEY};
pub use scope::Scope;
pub use source::{parse_source, SourceBlock, SourceFile};
