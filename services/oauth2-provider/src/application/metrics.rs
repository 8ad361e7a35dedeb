//! OAuth2 业务指标

use metrics::counter;

/// 记录签发的令牌
pub fn record_tokens_issued(grant_type: &str, with_refresh: bool) {
    let labels = [
        ("grant_type", grant_type.to_string()),
        ("with_refresh", with_refresh.to_string()),
    ];
    counter!("oauth2_tokens_issued_total", &labels).increment(1);
}

/// 记录令牌请求失败
pub fn record_token_failure(grant_type: &str, error_code: &str) {
    let labels = [
        ("grant_type", grant_type.to_string()),
        ("error", error_code.to_string()),
    ];
    counter!("oauth2_token_failures_total", &labels).increment(1);
}

/// 记录刷新令牌被盗用
pub fn record_refresh_token_theft() {
    counter!("oauth2_refresh_token_theft_total").increment(1);
}

/// 记录授权端点结果
pub fn record_authorize_outcome(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("oauth2_authorize_outcomes_total", &labels).increment(1);
}
