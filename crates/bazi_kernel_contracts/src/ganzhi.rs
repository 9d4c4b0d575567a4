#![forbid(unsafe_code)]

//! Sexagenary vocabulary: stems, branches, the five elements and the
//! categorical scales every stage speaks in. Lookups that relate these to one
//! another (stem element, hidden stems, ten gods) live in the engines'
//! dictionary; this module only names things and maps them to characters.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Element {
    #[serde(rename = "木")]
    Wood,
    #[serde(rename = "火")]
    Fire,
    #[serde(rename = "土")]
    Earth,
    #[serde(rename = "金")]
    Metal,
    #[serde(rename = "水")]
    Water,
}

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Wood,
        Element::Fire,
        Element::Earth,
        Element::Metal,
        Element::Water,
    ];

    pub fn as_char(self) -> char {
        match self {
            Element::Wood => '木',
            Element::Fire => '火',
            Element::Earth => '土',
            Element::Metal => '金',
            Element::Water => '水',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_char() == c)
    }

    /// 木生火, 火生土, 土生金, 金生水, 水生木.
    pub fn generates(self) -> Element {
        match self {
            Element::Wood => Element::Fire,
            Element::Fire => Element::Earth,
            Element::Earth => Element::Metal,
            Element::Metal => Element::Water,
            Element::Water => Element::Wood,
        }
    }

    /// 木克土, 土克水, 水克火, 火克金, 金克木.
    pub fn controls(self) -> Element {
        match self {
            Element::Wood => Element::Earth,
            Element::Earth => Element::Water,
            Element::Water => Element::Fire,
            Element::Fire => Element::Metal,
            Element::Metal => Element::Wood,
        }
    }

    pub fn generated_by(self) -> Element {
        Self::ALL
            .into_iter()
            .find(|e| e.generates() == self)
            .unwrap_or(self)
    }

    pub fn controlled_by(self) -> Element {
        Self::ALL
            .into_iter()
            .find(|e| e.controls() == self)
            .unwrap_or(self)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum YinYang {
    #[serde(rename = "阳")]
    Yang,
    #[serde(rename = "阴")]
    Yin,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Stem {
    #[serde(rename = "甲")]
    Jia,
    #[serde(rename = "乙")]
    Yi,
    #[serde(rename = "丙")]
    Bing,
    #[serde(rename = "丁")]
    Ding,
    #[serde(rename = "戊")]
    Wu,
    #[serde(rename = "己")]
    Ji,
    #[serde(rename = "庚")]
    Geng,
    #[serde(rename = "辛")]
    Xin,
    #[serde(rename = "壬")]
    Ren,
    #[serde(rename = "癸")]
    Gui,
}

const STEM_CHARS: [char; 10] = ['甲', '乙', '丙', '丁', '戊', '己', '庚', '辛', '壬', '癸'];

impl Stem {
    pub const ALL: [Stem; 10] = [
        Stem::Jia,
        Stem::Yi,
        Stem::Bing,
        Stem::Ding,
        Stem::Wu,
        Stem::Ji,
        Stem::Geng,
        Stem::Xin,
        Stem::Ren,
        Stem::Gui,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_char(self) -> char {
        STEM_CHARS[self.index()]
    }

    pub fn from_char(c: char) -> Option<Self> {
        STEM_CHARS
            .iter()
            .position(|s| *s == c)
            .map(|i| Self::ALL[i])
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Branch {
    #[serde(rename = "子")]
    Zi,
    #[serde(rename = "丑")]
    Chou,
    #[serde(rename = "寅")]
    Yin,
    #[serde(rename = "卯")]
    Mao,
    #[serde(rename = "辰")]
    Chen,
    #[serde(rename = "巳")]
    Si,
    #[serde(rename = "午")]
    Wu,
    #[serde(rename = "未")]
    Wei,
    #[serde(rename = "申")]
    Shen,
    #[serde(rename = "酉")]
    You,
    #[serde(rename = "戌")]
    Xu,
    #[serde(rename = "亥")]
    Hai,
}

const BRANCH_CHARS: [char; 12] = [
    '子', '丑', '寅', '卯', '辰', '巳', '午', '未', '申', '酉', '戌', '亥',
];

impl Branch {
    pub const ALL: [Branch; 12] = [
        Branch::Zi,
        Branch::Chou,
        Branch::Yin,
        Branch::Mao,
        Branch::Chen,
        Branch::Si,
        Branch::Wu,
        Branch::Wei,
        Branch::Shen,
        Branch::You,
        Branch::Xu,
        Branch::Hai,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_char(self) -> char {
        BRANCH_CHARS[self.index()]
    }

    pub fn from_char(c: char) -> Option<Self> {
        BRANCH_CHARS
            .iter()
            .position(|b| *b == c)
            .map(|i| Self::ALL[i])
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Season {
    #[serde(rename = "春")]
    Spring,
    #[serde(rename = "夏")]
    Summer,
    #[serde(rename = "秋")]
    Autumn,
    #[serde(rename = "冬")]
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "春",
            Season::Summer => "夏",
            Season::Autumn => "秋",
            Season::Winter => "冬",
        }
    }
}

/// Seasonal strength scale, strongest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum StateLevel {
    #[serde(rename = "旺")]
    Wang,
    #[serde(rename = "相")]
    Xiang,
    #[serde(rename = "休")]
    Xiu,
    #[serde(rename = "囚")]
    Qiu,
    #[serde(rename = "死")]
    Si,
}

impl StateLevel {
    pub const ALL: [StateLevel; 5] = [
        StateLevel::Wang,
        StateLevel::Xiang,
        StateLevel::Xiu,
        StateLevel::Qiu,
        StateLevel::Si,
    ];

    /// 旺=5 down to 死=1.
    pub fn rank(self) -> u8 {
        match self {
            StateLevel::Wang => 5,
            StateLevel::Xiang => 4,
            StateLevel::Xiu => 3,
            StateLevel::Qiu => 2,
            StateLevel::Si => 1,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.rank() == rank)
    }

    pub fn as_char(self) -> char {
        match self {
            StateLevel::Wang => '旺',
            StateLevel::Xiang => '相',
            StateLevel::Xiu => '休',
            StateLevel::Qiu => '囚',
            StateLevel::Si => '死',
        }
    }
}

impl fmt::Display for StateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HiddenRank {
    Main,
    Mid,
    Res,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TenGod {
    #[serde(rename = "比肩")]
    BiJian,
    #[serde(rename = "劫财")]
    JieCai,
    #[serde(rename = "食神")]
    ShiShen,
    #[serde(rename = "伤官")]
    ShangGuan,
    #[serde(rename = "偏财")]
    PianCai,
    #[serde(rename = "正财")]
    ZhengCai,
    #[serde(rename = "七杀")]
    QiSha,
    #[serde(rename = "正官")]
    ZhengGuan,
    #[serde(rename = "偏印")]
    PianYin,
    #[serde(rename = "正印")]
    ZhengYin,
}

impl TenGod {
    pub fn family(self) -> TenGodFamily {
        match self {
            TenGod::BiJian | TenGod::JieCai => TenGodFamily::Peer,
            TenGod::ShiShen | TenGod::ShangGuan => TenGodFamily::Output,
            TenGod::PianCai | TenGod::ZhengCai => TenGodFamily::Wealth,
            TenGod::QiSha | TenGod::ZhengGuan => TenGodFamily::Power,
            TenGod::PianYin | TenGod::ZhengYin => TenGodFamily::Resource,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TenGod::BiJian => "比肩",
            TenGod::JieCai => "劫财",
            TenGod::ShiShen => "食神",
            TenGod::ShangGuan => "伤官",
            TenGod::PianCai => "偏财",
            TenGod::ZhengCai => "正财",
            TenGod::QiSha => "七杀",
            TenGod::ZhengGuan => "正官",
            TenGod::PianYin => "偏印",
            TenGod::ZhengYin => "正印",
        }
    }
}

impl fmt::Display for TenGod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TenGodFamily {
    #[serde(rename = "比劫")]
    Peer,
    #[serde(rename = "食伤")]
    Output,
    #[serde(rename = "财")]
    Wealth,
    #[serde(rename = "官杀")]
    Power,
    #[serde(rename = "印")]
    Resource,
}

impl TenGodFamily {
    pub const ALL: [TenGodFamily; 5] = [
        TenGodFamily::Peer,
        TenGodFamily::Output,
        TenGodFamily::Wealth,
        TenGodFamily::Power,
        TenGodFamily::Resource,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TenGodFamily::Peer => "比劫",
            TenGodFamily::Output => "食伤",
            TenGodFamily::Wealth => "财",
            TenGodFamily::Power => "官杀",
            TenGodFamily::Resource => "印",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_and_branch_chars_round_trip() {
        for s in Stem::ALL {
            assert_eq!(Stem::from_char(s.as_char()), Some(s));
        }
        for b in Branch::ALL {
            assert_eq!(Branch::from_char(b.as_char()), Some(b));
        }
        assert_eq!(Stem::from_char('子'), None);
    }

    #[test]
    fn element_cycles_are_inverse() {
        for e in Element::ALL {
            assert_eq!(e.generates().generated_by(), e);
            assert_eq!(e.controls().controlled_by(), e);
        }
    }

    #[test]
    fn state_rank_is_five_to_one() {
        let ranks: Vec<u8> = StateLevel::ALL.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![5, 4, 3, 2, 1]);
        assert_eq!(StateLevel::from_rank(3), Some(StateLevel::Xiu));
        assert_eq!(StateLevel::from_rank(0), None);
    }

    #[test]
    fn serde_uses_chinese_characters() {
        let json = serde_json::to_string(&(Stem::Jia, Branch::Zi, StateLevel::Wang)).unwrap();
        assert_eq!(json, r#"["甲","子","旺"]"#);
        let rank: HiddenRank = serde_json::from_str(r#""MID""#).unwrap();
        assert_eq!(rank, HiddenRank::Mid);
    }
}
