use super::subject::Subject;
use std::fmt;

/// 一个 (年级, 科目) 组合，整条流水线独立运行一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Group {
    pub level: u8,
    pub subject: Subject,
}

impl Group {
    pub fn new(level: u8, subject: Subject) -> Self {
        Self { level, subject }
    }

    /// 该年级是否开设该科目
    pub fn is_offered(&self) -> bool {
        self.level >= self.subject.min_level()
    }

    /// 组前缀，如 `primary-3-science`，同时用于 URL、目录和断点文件名
    pub fn prefix(&self) -> String {
        format!("primary-{}-{}", self.level, self.subject.slug())
    }

    /// 按年级优先的顺序枚举所有开设的组合
    pub fn enumerate(levels: &[u8], subjects: &[Subject]) -> Vec<Group> {
        levels
            .iter()
            .flat_map(|&level| subjects.iter().map(move |&subject| Group::new(level, subject)))
            .filter(Group::is_offered)
            .collect()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}
