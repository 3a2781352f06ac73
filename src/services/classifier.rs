//! 失败分类 - 业务能力层
//!
//! 把一次远端写入失败归入四类之一，决定同步流程是删除、重试还是中止。
//!
//! 判断顺序固定为：冲突 → 授权 → 网络 → 未分类。
//! 网络类的判断依赖文本匹配，会和过期令牌的错误文本重叠，所以必须最后判断。

use std::fmt;
use std::sync::LazyLock;

use phf::phf_map;
use regex::Regex;

use crate::error::RemoteError;

/// 失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 远端已存在等价记录，视为已投递
    RemoteConflict,
    /// 凭证失效
    AuthorizationExpired,
    /// 设备离线或传输层失败
    NetworkUnavailable,
    /// 其他
    Unclassified,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::RemoteConflict => "远端冲突",
            FailureKind::AuthorizationExpired => "授权过期",
            FailureKind::NetworkUnavailable => "网络不可用",
            FailureKind::Unclassified => "未分类",
        };
        f.write_str(name)
    }
}

/// SQLSTATE / PostgREST 错误码
static ERROR_CODES: phf::Map<&'static str, FailureKind> = phf_map! {
    // unique_violation
    "23505" => FailureKind::RemoteConflict,
    // insufficient_privilege（行级安全拒绝）
    "42501" => FailureKind::AuthorizationExpired,
    // JWT 无效或过期
    "PGRST301" => FailureKind::AuthorizationExpired,
    // 匿名访问被禁用
    "PGRST302" => FailureKind::AuthorizationExpired,
};

static CONFLICT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)duplicate key|unique constraint|already exists").expect("valid regex")
});

static AUTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)jwt expired|invalid jwt|invalid refresh token|refresh token not found|invalid claim",
    )
    .expect("valid regex")
});

static NETWORK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)failed to fetch|network").expect("valid regex"));

/// 失败分类器
#[derive(Debug, Default, Clone, Copy)]
pub struct FailureClassifier;

impl FailureClassifier {
    /// 分类一次失败
    ///
    /// # 参数
    /// - `error`: 远端写入返回的错误
    /// - `online`: 设备当前是否联网
    pub fn classify(&self, error: &RemoteError, online: bool) -> FailureKind {
        let status = error.status();
        let code_kind = error.code().and_then(|code| ERROR_CODES.get(code)).copied();
        let message = error.message();

        if status == Some(409)
            || code_kind == Some(FailureKind::RemoteConflict)
            || CONFLICT_PATTERN.is_match(message)
        {
            return FailureKind::RemoteConflict;
        }

        if matches!(status, Some(401) | Some(403))
            || code_kind == Some(FailureKind::AuthorizationExpired)
            || AUTH_PATTERN.is_match(message)
        {
            return FailureKind::AuthorizationExpired;
        }

        if matches!(error, RemoteError::Transport { .. })
            || !online
            || NETWORK_PATTERN.is_match(message)
        {
            return FailureKind::NetworkUnavailable;
        }

        FailureKind::Unclassified
    }
}
