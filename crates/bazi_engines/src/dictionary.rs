#![forbid(unsafe_code)]

//! ElementDictionary: immutable lookup tables relating stems, branches,
//! elements and ten gods. Built once, never mutated.

use bazi_kernel_contracts::ganzhi::{Branch, Element, HiddenRank, Stem, TenGod, YinYang};
use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiddenStem {
    pub stem: Stem,
    pub rank: HiddenRank,
}

const fn hs(stem: Stem, rank: HiddenRank) -> HiddenStem {
    HiddenStem { stem, rank }
}

const STEM_ELEMENTS: [Element; 10] = [
    Element::Wood,
    Element::Wood,
    Element::Fire,
    Element::Fire,
    Element::Earth,
    Element::Earth,
    Element::Metal,
    Element::Metal,
    Element::Water,
    Element::Water,
];

const BRANCH_ELEMENTS: [Element; 12] = [
    Element::Water,
    Element::Earth,
    Element::Wood,
    Element::Wood,
    Element::Earth,
    Element::Fire,
    Element::Fire,
    Element::Earth,
    Element::Metal,
    Element::Metal,
    Element::Earth,
    Element::Water,
];

use HiddenRank::{Main, Mid, Res};

const HIDDEN_STEMS: [&[HiddenStem]; 12] = [
    // 子
    &[hs(Stem::Gui, Main)],
    // 丑
    &[hs(Stem::Ji, Main), hs(Stem::Gui, Mid), hs(Stem::Xin, Res)],
    // 寅
    &[hs(Stem::Jia, Main), hs(Stem::Bing, Mid), hs(Stem::Wu, Res)],
    // 卯
    &[hs(Stem::Yi, Main)],
    // 辰
    &[hs(Stem::Wu, Main), hs(Stem::Yi, Mid), hs(Stem::Gui, Res)],
    // 巳
    &[hs(Stem::Bing, Main), hs(Stem::Wu, Mid), hs(Stem::Geng, Res)],
    // 午
    &[hs(Stem::Ding, Main), hs(Stem::Ji, Mid)],
    // 未
    &[hs(Stem::Ji, Main), hs(Stem::Ding, Mid), hs(Stem::Yi, Res)],
    // 申
    &[hs(Stem::Geng, Main), hs(Stem::Ren, Mid), hs(Stem::Wu, Res)],
    // 酉
    &[hs(Stem::Xin, Main)],
    // 戌
    &[hs(Stem::Wu, Main), hs(Stem::Xin, Mid), hs(Stem::Ding, Res)],
    // 亥
    &[hs(Stem::Ren, Main), hs(Stem::Jia, Mid)],
];

/// `TEN_GOD_TABLE[day_master][other]`.
static TEN_GOD_TABLE: Lazy<[[TenGod; 10]; 10]> = Lazy::new(|| {
    let mut table = [[TenGod::BiJian; 10]; 10];
    for dm in Stem::ALL {
        for other in Stem::ALL {
            table[dm.index()][other.index()] = derive_ten_god(dm, other);
        }
    }
    table
});

fn derive_ten_god(day_master: Stem, other: Stem) -> TenGod {
    let me = ElementDictionary::stem_element(day_master);
    let it = ElementDictionary::stem_element(other);
    let same_polarity =
        ElementDictionary::stem_yin_yang(day_master) == ElementDictionary::stem_yin_yang(other);
    match (same_polarity, it) {
        (true, e) if e == me => TenGod::BiJian,
        (false, e) if e == me => TenGod::JieCai,
        (true, e) if e == me.generates() => TenGod::ShiShen,
        (false, e) if e == me.generates() => TenGod::ShangGuan,
        (true, e) if e == me.controls() => TenGod::PianCai,
        (false, e) if e == me.controls() => TenGod::ZhengCai,
        (true, e) if e == me.controlled_by() => TenGod::QiSha,
        (false, e) if e == me.controlled_by() => TenGod::ZhengGuan,
        (true, _) => TenGod::PianYin,
        (false, _) => TenGod::ZhengYin,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ElementDictionary;

impl ElementDictionary {
    pub fn stem_element(stem: Stem) -> Element {
        STEM_ELEMENTS[stem.index()]
    }

    /// 甲丙戊庚壬 are yang.
    pub fn stem_yin_yang(stem: Stem) -> YinYang {
        if stem.index() % 2 == 0 {
            YinYang::Yang
        } else {
            YinYang::Yin
        }
    }

    pub fn branch_element(branch: Branch) -> Element {
        BRANCH_ELEMENTS[branch.index()]
    }

    pub fn branch_yin_yang(branch: Branch) -> YinYang {
        if branch.index() % 2 == 0 {
            YinYang::Yang
        } else {
            YinYang::Yin
        }
    }

    /// Hidden stems ordered main, middle, residual.
    pub fn hidden_stems(branch: Branch) -> &'static [HiddenStem] {
        HIDDEN_STEMS[branch.index()]
    }

    pub fn main_hidden_stem(branch: Branch) -> Stem {
        HIDDEN_STEMS[branch.index()][0].stem
    }

    pub fn ten_god(day_master: Stem, other: Stem) -> TenGod {
        TEN_GOD_TABLE[day_master.index()][other.index()]
    }

    /// Storage branch (库/墓) of an element; earth keeps none of its own.
    pub fn grave_branch(element: Element) -> Option<Branch> {
        match element {
            Element::Water => Some(Branch::Chen),
            Element::Wood => Some(Branch::Wei),
            Element::Fire => Some(Branch::Xu),
            Element::Metal => Some(Branch::Chou),
            Element::Earth => None,
        }
    }
}
