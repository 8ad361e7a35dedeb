//! 权限词汇表：动作树 × 资源树 以及 scope 字符串解析

use super::scopes::{Scope, ScopeItem, Scopes, UndefinedScope};
use super::tree::{ActionTree, NodeSet, ResourceTree, ScopeTreeError};

/// 权限词汇表
///
/// 进程启动时构建一次，以引用方式传给需要解析 scope 的组件。
#[derive(Debug, Clone)]
pub struct ScopeVocabulary {
    actions: ActionTree,
    resources: ResourceTree,
}

impl ScopeVocabulary {
    pub fn define(actions: NodeSet, resources: NodeSet) -> Result<Self, ScopeTreeError> {
        Ok(Self {
            actions: ActionTree::build(actions)?,
            resources: ResourceTree::build(resources)?,
        })
    }

    /// 身份提供方自身使用的词汇表
    ///
    /// 动作：`read`、`write.{create,update,delete}`；
    /// 资源：`user.{email,profile}`、`client.{allowed_scope,secret}`、`consent`。
    pub fn standard() -> Result<Self, ScopeTreeError> {
        Self::define(
            NodeSet::new()
                .leaf("read")
                .branch("write", |w| w.leaf("create").leaf("update").leaf("delete")),
            NodeSet::new()
                .branch("user", |u| u.leaf("email").leaf("profile"))
                .branch("client", |c| c.leaf("allowed_scope").leaf("secret"))
                .leaf("consent"),
        )
    }

    pub fn actions(&self) -> &ActionTree {
        &self.actions
    }

    pub fn resources(&self) -> &ResourceTree {
        &self.resources
    }

    /// 解析单个 `action:resource`，资源部分可省略（省略即资源根节点）
    ///
    /// 不会失败：空串或任一半未定义时返回 `ScopeItem::Undefined`。
    pub fn parse_scope(&self, raw: &str) -> ScopeItem {
        if raw.is_empty() {
            return ScopeItem::Undefined(UndefinedScope::new(raw));
        }

        let (action, resource) = raw.split_once(':').unwrap_or((raw, ""));

        match (self.actions.get(action), self.resources.get(resource)) {
            (Some(action), Some(resource)) => {
                ScopeItem::Defined(Scope::new(action.clone(), resource.clone()))
            }
            _ => ScopeItem::Undefined(UndefinedScope::new(raw)),
        }
    }

    /// 按空白切分后逐个解析；空输入得到空集合
    pub fn parse_scopes(&self, raw: &str) -> Scopes {
        raw.split_whitespace().map(|s| self.parse_scope(s)).collect()
    }

    /// `*:`，覆盖全部动作与资源
    pub fn full_scope(&self) -> Scopes {
        Scopes::from(vec![Scope::new(
            self.actions.root().clone(),
            self.resources.root().clone(),
        )])
    }

    /// 公开客户端的默认 scope：只读访问用户自身资源
    pub fn default_public_scope(&self) -> Scopes {
        self.parse_scopes("read:user")
    }
}
