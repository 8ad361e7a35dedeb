//! 按查看者身份裁剪的只读视图

use chrono::{DateTime, Utc};
use idp_common::{ClientId, UserId};
use serde::Serialize;

use super::client::OAuth2Client;
use super::scope::{ScopeVocabulary, Scopes};
use super::user::User;

/// 查看者：已认证主体及其被授予的 scope
#[derive(Debug, Clone, Copy)]
pub struct Viewer<'a> {
    pub user_id: UserId,
    pub scope: &'a Scopes,
}

impl Viewer<'_> {
    /// 查看者的 scope 覆盖 `raw`；`raw` 未定义时视为不覆盖
    fn holds(&self, vocabulary: &ScopeVocabulary, raw: &str) -> bool {
        let required = vocabulary.parse_scope(raw);
        self.scope
            .iter()
            .any(|granted| granted.contains(&required))
    }
}

/// 客户端视图；密钥哈希永不输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientView {
    pub id: ClientId,
    pub name: String,
    pub is_confidential: bool,
    /// 仅所有者或持有 `read:client.allowed_scope` 者可见
    pub owner_id: Option<UserId>,
    pub allowed_scope: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ClientView {
    pub fn project(client: &OAuth2Client, viewer: Viewer<'_>, vocabulary: &ScopeVocabulary) -> Self {
        let privileged =
            viewer.user_id == client.owner_id || viewer.holds(vocabulary, "read:client.allowed_scope");

        Self {
            id: client.id,
            name: client.name.clone(),
            is_confidential: client.is_confidential,
            owner_id: privileged.then_some(client.owner_id),
            allowed_scope: privileged.then(|| client.allowed_scope.to_string()),
            updated_at: client.updated_at,
        }
    }
}

/// 用户视图；密码哈希永不输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    /// 本人或持有 `read:user.profile` 者可见
    pub display_name: Option<String>,
    /// 仅本人可见
    pub allowed_scope: Option<String>,
}

impl UserView {
    pub fn project(user: &User, viewer: Viewer<'_>, vocabulary: &ScopeVocabulary) -> Self {
        let is_self = viewer.user_id == user.id;
        let sees_profile = is_self || viewer.holds(vocabulary, "read:user.profile");

        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: sees_profile.then(|| user.display_name.clone()),
            allowed_scope: is_self.then(|| user.allowed_scope.to_string()),
        }
    }
}
