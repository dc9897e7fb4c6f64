//! ROI projection from static coefficient tables

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Annual ROI before adjustments
pub const BASE_ROI: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSize {
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl MarketSize {
    pub const ALL: [MarketSize; 4] = [Self::Small, Self::Medium, Self::Large, Self::VeryLarge];

    fn coefficient(self) -> f64 {
        match self {
            Self::Small => 0.8,
            Self::Medium => 1.0,
            Self::Large => 1.3,
            Self::VeryLarge => 1.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulatoryComplexity {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RegulatoryComplexity {
    pub const ALL: [RegulatoryComplexity; 4] = [Self::Low, Self::Medium, Self::High, Self::VeryHigh];

    fn coefficient(self) -> f64 {
        match self {
            Self::Low => 1.1,
            Self::Medium => 1.0,
            Self::High => 0.85,
            Self::VeryHigh => 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
}

impl CompetitionLevel {
    pub const ALL: [CompetitionLevel; 3] = [Self::Low, Self::Medium, Self::High];

    fn coefficient(self) -> f64 {
        match self {
            Self::Low => 1.2,
            Self::Medium => 1.0,
            Self::High => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeToMarket {
    Short,
    Medium,
    Long,
}

impl TimeToMarket {
    pub const ALL: [TimeToMarket; 3] = [Self::Short, Self::Medium, Self::Long];

    fn coefficient(self) -> f64 {
        match self {
            Self::Short => 1.15,
            Self::Medium => 1.0,
            Self::Long => 0.85,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoiInput {
    /// Amount invested, in BRL
    #[validate(range(exclusive_min = 0.0))]
    pub investment: f64,
    pub market_size: MarketSize,
    pub regulatory_complexity: RegulatoryComplexity,
    pub competition_level: CompetitionLevel,
    pub time_to_market: TimeToMarket,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoiProjection {
    /// Annual ROI as a fraction (0.25 = 25%)
    pub projected_roi: f64,
    pub projected_roi_percent: f64,
    pub expected_return: f64,
    pub net_profit: f64,
    /// Months to recover the investment; `None` if it never pays back
    pub payback_months: Option<f64>,
    pub risk_level: RiskLevel,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn calculate_roi(input: &RoiInput) -> RoiProjection {
    let roi = BASE_ROI
        * input.market_size.coefficient()
        * input.regulatory_complexity.coefficient()
        * input.competition_level.coefficient()
        * input.time_to_market.coefficient();

    let net_profit = input.investment * roi;
    let payback_months = (roi > 0.0).then(|| round2(12.0 / roi));

    let risk_points = input.regulatory_complexity as u8 + input.competition_level as u8 + input.time_to_market as u8;
    let risk_level = match risk_points {
        0..=2 => RiskLevel::Low,
        3..=4 => RiskLevel::Medium,
        _ => RiskLevel::High,
    };

    RoiProjection {
        projected_roi: roi,
        projected_roi_percent: round2(roi * 100.0),
        expected_return: round2(input.investment + net_profit),
        net_profit: round2(net_profit),
        payback_months,
        risk_level,
    }
}
