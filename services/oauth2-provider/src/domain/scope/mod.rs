//! 权限引擎：层级动作 × 资源授权

pub mod scopes;
pub mod tree;
pub mod vocabulary;

pub use scopes::{Scope, ScopeItem, Scopes, UndefinedScope};
pub use tree::{Action, ActionTree, NodeSet, Resource, ResourceTree, ScopeTreeError};
pub use vocabulary::ScopeVocabulary;
