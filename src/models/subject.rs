use serde::{Deserialize, Serialize};

/// 科目枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subject {
    /// 英语
    English,
    /// 华文
    Chinese,
    /// 高级华文
    HigherChinese,
    /// 数学
    Maths,
    /// 科学
    Science,
}

impl Subject {
    /// 全部科目（按站点顺序）
    pub const ALL: [Subject; 5] = [
        Subject::English,
        Subject::Chinese,
        Subject::HigherChinese,
        Subject::Maths,
        Subject::Science,
    ];

    /// 站点 URL 中使用的标识
    pub fn slug(self) -> &'static str {
        match self {
            Subject::English => "english",
            Subject::Chinese => "chinese",
            Subject::HigherChinese => "higher-chinese",
            Subject::Maths => "maths",
            Subject::Science => "science",
        }
    }

    /// 该科目开设的最低年级（科学从三年级开始）
    pub fn min_level(self) -> u8 {
        match self {
            Subject::Science => 3,
            _ => 1,
        }
    }

    /// 从站点标识解析科目
    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|subject| subject.slug() == s.trim().to_lowercase())
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}
