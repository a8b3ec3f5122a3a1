//! 科目模型
//!
//! 固定的 7 个标准科目，以及自由文本科目名到标准科目的归一化

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// 标准科目枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalSubject {
    /// 数学
    Mathematics,
    /// 语言（阅读）
    Language,
    /// 社会科学
    SocialScience,
    /// 生物
    Biology,
    /// 化学
    Chemistry,
    /// 物理
    Physics,
    /// 英语
    English,
}

/// 同义词表，键为去重音、小写后的名称
static SYNONYMS: phf::Map<&'static str, CanonicalSubject> = phf_map! {
    "matematicas" => CanonicalSubject::Mathematics,
    "matematica" => CanonicalSubject::Mathematics,
    "mathematics" => CanonicalSubject::Mathematics,
    "math" => CanonicalSubject::Mathematics,
    "maths" => CanonicalSubject::Mathematics,
    "razonamiento cuantitativo" => CanonicalSubject::Mathematics,
    "lenguaje" => CanonicalSubject::Language,
    "lengua" => CanonicalSubject::Language,
    "lengua castellana" => CanonicalSubject::Language,
    "lectura" => CanonicalSubject::Language,
    "lectura critica" => CanonicalSubject::Language,
    "espanol" => CanonicalSubject::Language,
    "castellano" => CanonicalSubject::Language,
    "language" => CanonicalSubject::Language,
    "ciencias sociales" => CanonicalSubject::SocialScience,
    "sociales" => CanonicalSubject::SocialScience,
    "sociales y ciudadanas" => CanonicalSubject::SocialScience,
    "competencias ciudadanas" => CanonicalSubject::SocialScience,
    "social science" => CanonicalSubject::SocialScience,
    "social sciences" => CanonicalSubject::SocialScience,
    "biologia" => CanonicalSubject::Biology,
    "biology" => CanonicalSubject::Biology,
    "quimica" => CanonicalSubject::Chemistry,
    "chemistry" => CanonicalSubject::Chemistry,
    "fisica" => CanonicalSubject::Physics,
    "physics" => CanonicalSubject::Physics,
    "ingles" => CanonicalSubject::English,
    "english" => CanonicalSubject::English,
};

impl CanonicalSubject {
    /// 全部标准科目，按报告展示顺序
    pub const ALL: [CanonicalSubject; 7] = [
        CanonicalSubject::Mathematics,
        CanonicalSubject::Language,
        CanonicalSubject::SocialScience,
        CanonicalSubject::Biology,
        CanonicalSubject::Chemistry,
        CanonicalSubject::Physics,
        CanonicalSubject::English,
    ];

    /// 标准科目数量
    pub const COUNT: usize = 7;

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            CanonicalSubject::Mathematics => "Matemáticas",
            CanonicalSubject::Language => "Lenguaje",
            CanonicalSubject::SocialScience => "Ciencias Sociales",
            CanonicalSubject::Biology => "Biología",
            CanonicalSubject::Chemistry => "Química",
            CanonicalSubject::Physics => "Física",
            CanonicalSubject::English => "Inglés",
        }
    }

    /// 是否属于自然科学（生物、化学、物理）
    pub fn is_natural_science(self) -> bool {
        matches!(
            self,
            CanonicalSubject::Biology | CanonicalSubject::Chemistry | CanonicalSubject::Physics
        )
    }

    /// 该科目对总分的最大贡献
    ///
    /// 三门自然科学合计 100 分，与一门普通科目等权
    pub fn weight_cap(self) -> f64 {
        if self.is_natural_science() {
            100.0 / 3.0
        } else {
            100.0
        }
    }

    /// 从自由文本查找标准科目（忽略大小写和重音）
    pub fn find(label: &str) -> Option<Self> {
        SYNONYMS.get(fold_label(label).as_str()).copied()
    }
}

impl std::fmt::Display for CanonicalSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 归一化后的科目标签
///
/// 无法识别的标签原样保留，后续计分时会被排除
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectLabel {
    Canonical(CanonicalSubject),
    Unrecognized(String),
}

impl SubjectLabel {
    pub fn canonical(&self) -> Option<CanonicalSubject> {
        match self {
            SubjectLabel::Canonical(subject) => Some(*subject),
            SubjectLabel::Unrecognized(_) => None,
        }
    }
}

/// 归一化科目标签（全函数，不会失败）
pub fn normalize(label: &str) -> SubjectLabel {
    match CanonicalSubject::find(label) {
        Some(subject) => SubjectLabel::Canonical(subject),
        None => SubjectLabel::Unrecognized(label.to_string()),
    }
}

/// 小写、去重音、合并空白，`-` 与 `_` 视为空格
fn fold_label(label: &str) -> String {
    let folded: String = label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            '-' | '_' => ' ',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
