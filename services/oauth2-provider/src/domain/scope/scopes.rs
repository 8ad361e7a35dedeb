//! Scope 与 Scope 集合

use std::fmt;

use super::tree::{Action, Resource};

/// 一个 (动作, 资源) 授权
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    action: Action,
    resource: Resource,
}

impl Scope {
    pub fn new(action: Action, resource: Resource) -> Self {
        Self { action, resource }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// other 的动作与资源都是 self 对应节点的子集
    pub fn contains(&self, other: &Scope) -> bool {
        other.action.is_subset_of(&self.action) && other.resource.is_subset_of(&self.resource)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.resource)
    }
}

/// 无法识别的 scope，保留原始文本
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UndefinedScope {
    raw: String,
}

impl UndefinedScope {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// 集合元素：已定义 scope 或未定义标记
///
/// 未定义元素不包含任何 scope，也不被任何 scope 包含。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeItem {
    Defined(Scope),
    Undefined(UndefinedScope),
}

impl ScopeItem {
    pub fn as_defined(&self) -> Option<&Scope> {
        match self {
            Self::Defined(scope) => Some(scope),
            Self::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined(_))
    }

    pub fn contains(&self, other: &ScopeItem) -> bool {
        match (self, other) {
            (Self::Defined(a), Self::Defined(b)) => a.contains(b),
            _ => false,
        }
    }
}

impl From<Scope> for ScopeItem {
    fn from(scope: Scope) -> Self {
        Self::Defined(scope)
    }
}

/// 有序 scope 集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes(Vec<ScopeItem>);

impl Scopes {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopeItem> {
        self.0.iter()
    }

    /// 仅遍历已定义的 scope
    pub fn defined(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter().filter_map(ScopeItem::as_defined)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// self 中每个已定义 scope 都被 other 中某个 scope 包含
    ///
    /// 未定义元素直接跳过，因此空集合小于等于任何集合。
    pub fn less_than_or_equal(&self, other: &Scopes) -> bool {
        self.defined()
            .all(|scope| other.defined().any(|allowed| allowed.contains(scope)))
    }

    /// 互相小于等于
    pub fn is_equivalent(&self, other: &Scopes) -> bool {
        self.less_than_or_equal(other) && other.less_than_or_equal(self)
    }

    /// 将 self 收窄到 other 允许的范围
    ///
    /// 对每一对存在包含关系的 (左, 右)，保留更具体的一方；
    /// 左侧未定义元素原样保留，结果去重并保持左侧顺序。
    pub fn intersect(&self, other: &Scopes) -> Scopes {
        let mut result: Vec<ScopeItem> = Vec::new();
        let mut push = |item: ScopeItem| {
            if !result.contains(&item) {
                result.push(item);
            }
        };

        for item in &self.0 {
            let scope = match item {
                ScopeItem::Defined(scope) => scope,
                ScopeItem::Undefined(_) => {
                    push(item.clone());
                    continue;
                }
            };

            for allowed in other.defined() {
                if allowed.contains(scope) {
                    push(ScopeItem::Defined(scope.clone()));
                } else if scope.contains(allowed) {
                    push(ScopeItem::Defined(allowed.clone()));
                }
            }
        }

        Scopes(result)
    }
}

impl fmt::Display for Scopes {
    /// 已定义 scope 以空格连接，未定义元素不输出
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, scope) in self.defined().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", scope)?;
        }
        Ok(())
    }
}

impl From<Vec<Scope>> for Scopes {
    fn from(scopes: Vec<Scope>) -> Self {
        Self(scopes.into_iter().map(ScopeItem::Defined).collect())
    }
}

impl FromIterator<ScopeItem> for Scopes {
    fn from_iter<I: IntoIterator<Item = ScopeItem>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Scopes {
    type Item = &'a ScopeItem;
    type IntoIter = std::slice::Iter<'a, ScopeItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
