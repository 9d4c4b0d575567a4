#![forbid(unsafe_code)]

//! Table names shared by both stores. Each analysis stage owns its tables
//! and rewrites only those.

pub const DELING_SNAPSHOT: &str = "bazi_deling_snapshot";
pub const DELING_RESULT: &str = "bazi_deling_result";
pub const ROOTQI_DETAIL: &str = "bazi_rootqi_detail";
pub const ROOTQI_SUMMARY: &str = "bazi_rootqi_summary";
pub const TONGGEN_DETAIL: &str = "bazi_tonggen_detail";
pub const TOUGAN_DETAIL: &str = "bazi_tougan_detail";
pub const HANZAO_DETAIL: &str = "bazi_hanzao_detail";
pub const HANZAO_SUMMARY: &str = "bazi_hanzao_summary";
pub const GEJU_CANDIDATE: &str = "bazi_geju_candidate";
pub const GEJU_FORMATION: &str = "bazi_geju_formation";
pub const GEJU_SUMMARY: &str = "bazi_geju_summary";
pub const YONGSHEN_RESULT: &str = "bazi_yongshen_result";
pub const ELEMENT_SCORE: &str = "bazi_element_score";
pub const RULESETS: &str = "rulesets";

pub const ALL: [&str; 14] = [
    DELING_SNAPSHOT,
    DELING_RESULT,
    ROOTQI_DETAIL,
    ROOTQI_SUMMARY,
    TONGGEN_DETAIL,
    TOUGAN_DETAIL,
    HANZAO_DETAIL,
    HANZAO_SUMMARY,
    GEJU_CANDIDATE,
    GEJU_FORMATION,
    GEJU_SUMMARY,
    YONGSHEN_RESULT,
    ELEMENT_SCORE,
    RULESETS,
];

pub fn lookup(name: &str) -> Option<&'static str> {
    ALL.iter().copied().find(|t| *t == name)
}
