use serde::{Deserialize, Serialize};

/// One step of a profit-taking plan. `multiplier`, `holdings` and `profit`
/// are derived by the trajectory builder; only `market_cap` and
/// `profit_percent` are inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub market_cap: f64,
    #[serde(default)]
    pub multiplier: f64,
    #[serde(default)]
    pub holdings: f64,
    #[serde(default)]
    pub profit_percent: f64,
    #[serde(default)]
    pub profit: f64,
}

impl Milestone {
    /// A milestone with only its inputs set; derived fields are zero until built.
    pub fn target(market_cap: f64, profit_percent: f64) -> Self {
        Self {
            market_cap,
            multiplier: 0.0,
            holdings: 0.0,
            profit_percent,
            profit: 0.0,
        }
    }

    /// Post-sale position, as shown in the "new holdings" column.
    pub fn holdings_after_sale(&self) -> f64 {
        (self.holdings - self.profit).max(0.0)
    }
}

/// Base position: holdings at today's market cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinData {
    pub holdings: f64,
    pub market_cap: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseField {
    Holdings,
    MarketCap,
}

/// A named, independent profit-taking plan.
///
/// `milestones[0]` is the base milestone and the single owner of the base
/// position; `coin_data()` is a read-only projection of it. On the wire the
/// projection is written out as `coinData` for compatibility with stored data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PredictionRecord", try_from = "PredictionRecord")]
pub struct Prediction {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) milestones: Vec<Milestone>,
}

impl Prediction {
    /// A prediction holding only its base milestone.
    pub fn new(id: impl Into<String>, name: impl Into<String>, base: CoinData) -> Self {
        Prediction {
            id: id.into(),
            name: name.into(),
            milestones: vec![super::engine::base_milestone(base)],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn coin_data(&self) -> CoinData {
        let base = &self.milestones[0];
        CoinData {
            holdings: base.holdings,
            market_cap: base.market_cap,
        }
    }
}

/// Storage and clipboard shape of a prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub coin_data: CoinData,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl From<Prediction> for PredictionRecord {
    fn from(value: Prediction) -> Self {
        PredictionRecord {
            coin_data: value.coin_data(),
            id: value.id,
            name: value.name,
            milestones: value.milestones,
        }
    }
}

impl TryFrom<PredictionRecord> for Prediction {
    type Error = String;

    fn try_from(record: PredictionRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err("prediction id must not be empty".to_string());
        }

        let mut milestones = record.milestones;
        if milestones.is_empty() {
            milestones.push(Milestone::target(record.coin_data.market_cap, 0.0));
            milestones[0].holdings = record.coin_data.holdings;
        }

        let base = milestones[0];
        check_amount("coinData.holdings", base.holdings)?;
        for (index, milestone) in milestones.iter().enumerate() {
            check_amount(&format!("milestones[{index}].marketCap"), milestone.market_cap)?;
            if !(0.0..=100.0).contains(&milestone.profit_percent) {
                return Err(format!(
                    "milestones[{index}].profitPercent must be between 0 and 100"
                ));
            }
            if milestone.market_cap < base.market_cap {
                return Err(format!(
                    "milestones[{index}].marketCap is below the base market cap"
                ));
            }
        }

        let coin_data = CoinData {
            holdings: base.holdings,
            market_cap: base.market_cap,
        };
        Ok(Prediction {
            milestones: super::engine::build_trajectory(coin_data, &milestones),
            id: record.id,
            name: record.name,
        })
    }
}

fn check_amount(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{name} must be a finite number >= 0"));
    }
    Ok(())
}

/// Rendering view of one built milestone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryRow {
    pub index: usize,
    pub market_cap: f64,
    pub multiplier: f64,
    pub holdings: f64,
    pub profit_percent: f64,
    pub profit: f64,
    pub new_holdings: f64,
    pub cumulative_profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectorySummary {
    pub total_profit: f64,
    pub final_holdings: f64,
    pub milestone_count: usize,
}
