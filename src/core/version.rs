// データベースバージョン
//
// (major, minor, point, step) の4要素からなる順序付きバージョン。
// スキーマ変更の識別子と、データベースに記録されたリビジョンの両方に使用します。

use crate::core::error::VersionParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// データベースバージョン
///
/// 比較は major → minor → point → step の辞書式順序で行われます。
/// 各要素は符号なし整数のため、負のバージョンは表現できません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseVersion {
    pub major: u32,
    pub minor: u32,
    pub point: u32,
    pub step: u32,
}

impl DatabaseVersion {
    /// ベースライン（何も適用されていない状態）
    pub const ZERO: DatabaseVersion = DatabaseVersion::new(0, 0, 0, 0);

    /// 新しいバージョンを作成
    pub const fn new(major: u32, minor: u32, point: u32, step: u32) -> Self {
        Self {
            major,
            minor,
            point,
            step,
        }
    }

    /// ベースラインかどうか
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Default for DatabaseVersion {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for DatabaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.point, self.step)
    }
}

impl FromStr for DatabaseVersion {
    type Err = VersionParseError;

    /// `major.minor.point.step` 形式の文字列を解析
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 4 {
            return Err(VersionParseError::new(
                s,
                format!("expected 4 components, found {}", parts.len()),
            ));
        }

        let mut components = [0u32; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            // "+1" のような符号付き表記は u32::from_str が受け付けるため明示的に弾く
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(VersionParseError::new(
                    s,
                    format!("component '{}' is not a non-negative integer", part),
                ));
            }
            *slot = part.parse::<u32>().map_err(|e| {
                VersionParseError::new(s, format!("component '{}' is out of range: {}", part, e))
            })?;
        }

        let [major, minor, point, step] = components;
        Ok(Self::new(major, minor, point, step))
    }
}

impl TryFrom<String> for DatabaseVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatabaseVersion> for String {
    fn from(version: DatabaseVersion) -> Self {
        version.to_string()
    }
}
