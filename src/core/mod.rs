mod engine;
mod store;
mod types;

pub use engine::{
    base_milestone, build_trajectory, preview_against, project_milestone, summarize,
    trajectory_rows,
};
pub use store::{BasePolicy, BaseResetProposal, BaseUpdate, PredictionStore};
pub use types::{
    BaseField, CoinData, Milestone, Prediction, PredictionRecord, TrajectoryRow,
    TrajectorySummary,
};
