#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::{ChartId, FourPillars};
use bazi_kernel_contracts::profile::{DayMaster, ElementTally, PillarProfile};
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::dictionary::ElementDictionary;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default)]
pub struct PillarProfileRuntime;

impl PillarProfileRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, chart_id: &ChartId, pillars: &FourPillars) -> EngineResult<PillarProfile> {
        chart_id.validate()?;
        pillars.validate()?;

        let day_stem = pillars
            .day_stem()
            .ok_or_else(|| EngineError::missing("four_pillars", "day"))?;
        let day_master = DayMaster {
            stem: day_stem,
            element: ElementDictionary::stem_element(day_stem),
            yin_yang: ElementDictionary::stem_yin_yang(day_stem),
        };

        let mut raw_tally = ElementTally::default();
        let mut hidden_tally = ElementTally::default();
        for p in pillars.iter() {
            raw_tally.add(ElementDictionary::stem_element(p.stem));
            raw_tally.add(ElementDictionary::branch_element(p.branch));
            for h in ElementDictionary::hidden_stems(p.branch) {
                hidden_tally.add(ElementDictionary::stem_element(h.stem));
            }
        }

        let profile = PillarProfile {
            chart_id: chart_id.clone(),
            day_master,
            raw_tally,
            hidden_tally,
        };
        profile.validate()?;
        debug!(
            chart_id = %chart_id,
            day_master = %day_stem,
            missing = ?profile.raw_tally.missing(),
            "pillar profile built"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi_kernel_contracts::ganzhi::{Element, YinYang};

    #[test]
    fn at_profile_01_raw_tally_always_counts_eight() {
        let rt = PillarProfileRuntime::new();
        for text in ["甲子,丙子,甲子,甲子", "庚申,戊午,戊辰,癸亥", "丁未,丁未,丁未,丁未"] {
            let pillars = FourPillars::parse(text).unwrap();
            let p = rt.run(&ChartId::new("c").unwrap(), &pillars).unwrap();
            assert_eq!(p.raw_tally.total(), 8, "{text}");
        }
    }

    #[test]
    fn at_profile_02_day_master_comes_from_day_stem() {
        let pillars = FourPillars::parse("庚申,戊午,戊辰,癸亥").unwrap();
        let p = PillarProfileRuntime::new()
            .run(&ChartId::new("c").unwrap(), &pillars)
            .unwrap();
        assert_eq!(p.day_master.element, Element::Earth);
        assert_eq!(p.day_master.yin_yang, YinYang::Yang);
        assert_eq!(p.raw_tally.get(Element::Earth), 3);
        assert_eq!(p.raw_tally.get(Element::Wood), 0);
    }

    #[test]
    fn at_profile_03_three_pillars_fail_as_invalid_input() {
        let mut pillars = FourPillars::parse("甲子,丙子,甲子,甲子").unwrap();
        pillars.pillars.pop();
        let err = PillarProfileRuntime::new()
            .run(&ChartId::new("c").unwrap(), &pillars)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
