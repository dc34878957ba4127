use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ComponentKey;

/// One revenue line inside a segment, in billions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    /// Base fiscal-year revenue
    pub revenue: f64,
    /// Fractional annual growth rate (0.13 = 13%)
    pub growth_rate: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reporting segment. Aggregate fields are display context only; projections
/// are driven entirely by `components`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub name: String,
    pub fy2025_revenue: f64,
    pub fy2024_revenue: f64,
    pub growth_rate: f64,
    pub operating_margin: f64,
    pub percent_of_total: f64,
    pub components: Vec<Component>,
    #[serde(default)]
    pub growth_drivers: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
}

impl Segment {
    pub fn key_for(&self, component: &Component) -> ComponentKey {
        ComponentKey::new(self.id.as_str(), component.name.as_str())
    }

    /// Sum of component base revenues
    pub fn component_revenue(&self) -> f64 {
        self.components.iter().map(|c| c.revenue).sum()
    }
}

/// One projected year. Never mutated after the engine emits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: i32,
    /// Projected revenue by segment id
    pub segment_revenue: BTreeMap<String, f64>,
    pub total_revenue: f64,
    pub fcf_margin: f64,
    pub fcf: f64,
    pub discount_factor: f64,
    pub present_value: f64,
}

/// Valuation snapshot produced by a full recalculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfModel {
    pub projections: Vec<YearProjection>,
    pub wacc: f64,
    pub terminal_growth: f64,
    pub terminal_value: f64,
    pub pv_terminal_value: f64,
    pub enterprise_value: f64,
    pub cash: f64,
    pub debt: f64,
    pub equity_value: f64,
    pub shares_outstanding: f64,
    /// Rounded to 2 decimals
    pub fair_value_per_share: f64,
}

impl DcfModel {
    pub fn fcf_series(&self) -> impl Iterator<Item = f64> + '_ {
        self.projections.iter().map(|p| p.fcf)
    }

    pub fn final_year(&self) -> Option<&YearProjection> {
        self.projections.last()
    }
}

/// Base-case assumptions shipped with a company dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseCase {
    pub wacc: f64,
    pub terminal_growth: f64,
    pub cash: f64,
    pub debt: f64,
    pub shares_outstanding: f64,
    /// FCF margin per projection year, index 0 = first projected year
    pub fcf_margins: Vec<f64>,
    /// Analyst-published fair value, kept for reference next to the
    /// engine-computed base case
    #[serde(default)]
    pub published_fair_value: Option<f64>,
    /// Analyst-published projection series behind `published_fair_value`
    #[serde(default)]
    pub published_projections: Vec<YearProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub current_price: f64,
    pub market_cap: f64,
    pub shares_outstanding: f64,
    pub date_updated: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rating {
    Buy,
    Hold,
    Sell,
    Outperform,
}

impl Rating {
    pub fn to_label(&self) -> &'static str {
        match self {
            Rating::Buy => "BUY",
            Rating::Hold => "HOLD",
            Rating::Sell => "SELL",
            Rating::Outperform => "OUTPERFORM",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalysts {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rating: Rating,
    pub target_price: f64,
    pub upside: f64,
    /// Low and high ends of the suggested entry range
    pub suggested_entry: (f64, f64),
    #[serde(default)]
    pub catalysts: Catalysts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetric {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTimeSeriesPoint {
    pub period: String,
    pub value: String,
}

/// Earnings-call takeaway attached to one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptInsight {
    pub segment_id: String,
    pub component: String,
    pub summary: String,
    #[serde(default)]
    pub metrics: Vec<TranscriptMetric>,
    #[serde(default)]
    pub time_series: Vec<TranscriptTimeSeriesPoint>,
    #[serde(default)]
    pub source: Option<String>,
}

impl TranscriptInsight {
    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(self.segment_id.as_str(), self.component.as_str())
    }
}

/// Immutable per-company reference dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyModel {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub segments: Vec<Segment>,
    pub base_case: BaseCase,
    pub market_data: MarketData,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub transcript_insights: Vec<TranscriptInsight>,
}

impl CompanyModel {
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn component(&self, key: &ComponentKey) -> Option<&Component> {
        self.segment(key.segment_id())?
            .components
            .iter()
            .find(|c| c.name == key.component())
    }

    pub fn insight_for(&self, key: &ComponentKey) -> Option<&TranscriptInsight> {
        self.transcript_insights
            .iter()
            .find(|i| i.segment_id == key.segment_id() && i.component == key.component())
    }
}

/// Symbol/name pair for company pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyOption {
    pub symbol: String,
    pub name: String,
}
