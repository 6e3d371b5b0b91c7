use super::{RankingContext, RankingStrategy};
use crate::domain::{sort_by_apy_descending, Opportunity, StrategyKind};

/// Rank purely by supply APY, deeper pool first on ties
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestYieldStrategy;

impl RankingStrategy for HighestYieldStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HighestYield
    }

    fn rank(&self, opportunities: Vec<Opportunity>, _ctx: &RankingContext<'_>) -> Vec<Opportunity> {
        sort_by_apy_descending(opportunities)
    }
}
