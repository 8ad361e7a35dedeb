//! 动作树 / 资源树
//!
//! 节点路径为祖先名称的点号拼接（根节点除外）。动作根节点路径为 `*`，
//! 资源根节点路径为空字符串。节点 X 属于节点 Y 的子集，当且仅当
//! X 与 Y 路径相同，或 Y 是 X 的祖先。

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

/// 节点种类（动作 / 资源）
pub trait NodeKind: fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + Send + Sync + 'static {
    /// 根节点路径
    const ROOT_PATH: &'static str;
    const LABEL: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKind;

impl NodeKind for ActionKind {
    const ROOT_PATH: &'static str = "*";
    const LABEL: &'static str = "action";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKind;

impl NodeKind for ResourceKind {
    const ROOT_PATH: &'static str = "";
    const LABEL: &'static str = "resource";
}

/// 树节点
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node<K: NodeKind> {
    path: Arc<str>,
    _kind: PhantomData<K>,
}

pub type Action = Node<ActionKind>;
pub type Resource = Node<ResourceKind>;

impl<K: NodeKind> Node<K> {
    fn new(path: &str) -> Self {
        Self {
            path: Arc::from(path),
            _kind: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        &*self.path == K::ROOT_PATH
    }

    /// 节点自身的名称（路径最后一段）
    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// self 与 other 相同，或 other 是 self 的祖先
    pub fn is_subset_of(&self, other: &Self) -> bool {
        if other.is_root() {
            return true;
        }
        if self.is_root() {
            return false;
        }

        match self.path.strip_prefix(other.path()) {
            Some("") => true,
            Some(rest) => rest.starts_with('.'),
            None => false,
        }
    }
}

impl<K: NodeKind> fmt::Display for Node<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeTreeError {
    #[error("{kind} branch '{path}' declares no child nodes")]
    EmptyBranch { kind: &'static str, path: String },

    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    #[error("duplicate {kind} path '{path}'")]
    Duplicate { kind: &'static str, path: String },
}

/// 节点声明集合
///
/// ```ignore
/// let actions = NodeSet::new()
///     .leaf("read")
///     .branch("write", |w| w.leaf("create").leaf("update").leaf("delete"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    decls: Vec<NodeDecl>,
}

#[derive(Debug, Clone)]
struct NodeDecl {
    name: String,
    children: Option<NodeSet>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明叶子节点
    pub fn leaf(mut self, name: impl Into<String>) -> Self {
        self.decls.push(NodeDecl {
            name: name.into(),
            children: None,
        });
        self
    }

    /// 声明分支节点，分支至少要有一个子节点
    pub fn branch(mut self, name: impl Into<String>, build: impl FnOnce(NodeSet) -> NodeSet) -> Self {
        self.decls.push(NodeDecl {
            name: name.into(),
            children: Some(build(NodeSet::new())),
        });
        self
    }
}

/// 构建完成的节点树，附带按路径索引的扁平查找表
#[derive(Debug, Clone)]
pub struct Tree<K: NodeKind> {
    root: Node<K>,
    by_path: HashMap<String, Node<K>>,
    parents: HashMap<String, Node<K>>,
    order: Vec<Node<K>>,
}

pub type ActionTree = Tree<ActionKind>;
pub type ResourceTree = Tree<ResourceKind>;

impl<K: NodeKind> Tree<K> {
    pub fn build(set: NodeSet) -> Result<Self, ScopeTreeError> {
        let root = Node::new(K::ROOT_PATH);
        let mut tree = Self {
            root: root.clone(),
            by_path: HashMap::from([(K::ROOT_PATH.to_string(), root.clone())]),
            parents: HashMap::new(),
            order: vec![root.clone()],
        };
        tree.register(&root, set)?;
        Ok(tree)
    }

    fn register(&mut self, parent: &Node<K>, set: NodeSet) -> Result<(), ScopeTreeError> {
        for decl in set.decls {
            if !is_valid_name(&decl.name) {
                return Err(ScopeTreeError::InvalidName {
                    kind: K::LABEL,
                    name: decl.name,
                });
            }

            let path = if parent.is_root() {
                decl.name
            } else {
                format!("{}.{}", parent.path(), decl.name)
            };

            if self.by_path.contains_key(&path) {
                return Err(ScopeTreeError::Duplicate { kind: K::LABEL, path });
            }

            let node = Node::new(&path);
            self.by_path.insert(path.clone(), node.clone());
            self.parents.insert(path.clone(), parent.clone());
            self.order.push(node.clone());

            if let Some(children) = decl.children {
                if children.decls.is_empty() {
                    return Err(ScopeTreeError::EmptyBranch { kind: K::LABEL, path });
                }
                self.register(&node, children)?;
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Node<K> {
        &self.root
    }

    /// 按点号路径查找节点
    pub fn get(&self, path: &str) -> Option<&Node<K>> {
        self.by_path.get(path)
    }

    pub fn parent(&self, node: &Node<K>) -> Option<&Node<K>> {
        self.parents.get(node.path())
    }

    pub fn children<'a>(&'a self, node: &'a Node<K>) -> impl Iterator<Item = &'a Node<K>> + 'a {
        self.order
            .iter()
            .filter(move |candidate| self.parent(candidate) == Some(node))
    }

    /// 按声明顺序遍历全部节点（含根节点）
    pub fn nodes(&self) -> impl Iterator<Item = &Node<K>> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
