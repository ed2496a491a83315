use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::engine::{build_trajectory, preview_against};
use super::types::{BaseField, CoinData, Milestone, Prediction};
use crate::error::StoreError;
use crate::persistence::{
    PredictionRepository, default_predictions, parse_predictions, validate_collection,
};

/// What happens to custom milestones when the base position changes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BasePolicy {
    /// Re-derive existing milestones from their `(marketCap, profitPercent)`.
    #[default]
    Recompute,
    /// Ask before discarding every non-base milestone.
    ConfirmReset,
}

/// Pending destructive base change, resolved by
/// [`PredictionStore::confirm_base_reset`] or cancelled by dropping it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResetProposal {
    pub prediction_id: String,
    pub field: BaseField,
    pub value: f64,
    pub discarded_milestones: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum BaseUpdate {
    Applied,
    NeedsConfirmation { proposal: BaseResetProposal },
}

/// Owner of the prediction collection and the active selection.
///
/// Every successful mutation is saved through the repository before it
/// returns. Rejected mutations leave the collection untouched and save nothing.
pub struct PredictionStore<R> {
    predictions: Vec<Prediction>,
    active_id: String,
    policy: BasePolicy,
    repository: R,
}

impl<R: PredictionRepository> PredictionStore<R> {
    pub fn open(repository: R, policy: BasePolicy) -> Self {
        let mut predictions = repository.load();
        if predictions.is_empty() {
            predictions = default_predictions();
        }
        let active_id = predictions[0].id().to_string();
        info!(
            predictions = predictions.len(),
            ?policy,
            "prediction store opened"
        );
        PredictionStore {
            predictions,
            active_id,
            policy,
            repository,
        }
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn active(&self) -> &Prediction {
        &self.predictions[self.active_index()]
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn add_prediction(&mut self) -> &Prediction {
        let prediction = Prediction::new(
            self.fresh_id(),
            format!("Prediction {}", self.predictions.len() + 1),
            CoinData::default(),
        );
        debug!(id = prediction.id(), "prediction added");
        self.active_id = prediction.id().to_string();
        self.predictions.push(prediction);
        self.persist();
        self.active()
    }

    pub fn remove_prediction(&mut self, id: &str) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        if self.predictions.len() == 1 {
            return Err(StoreError::LastPrediction);
        }

        self.predictions.remove(index);
        if self.active_id == id {
            self.active_id = self.predictions[0].id().to_string();
        }
        debug!(id, "prediction removed");
        self.persist();
        Ok(())
    }

    pub fn rename_prediction(&mut self, id: &str, name: &str) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        self.predictions[index].name = name.to_string();
        self.persist();
        Ok(())
    }

    /// Moves one prediction from `from` to `to`; the active selection follows
    /// its prediction, not its position.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        let len = self.predictions.len();
        for index in [from, to] {
            if index >= len {
                return Err(StoreError::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }

        let moved = self.predictions.remove(from);
        self.predictions.insert(to, moved);
        self.persist();
        Ok(())
    }

    /// Replaces the whole collection. The new collection is validated up front;
    /// on rejection nothing changes.
    pub fn replace_all(&mut self, predictions: Vec<Prediction>) -> Result<(), StoreError> {
        validate_collection(&predictions)?;

        self.predictions = predictions;
        if !self.predictions.iter().any(|p| p.id == self.active_id) {
            self.active_id = self.predictions[0].id().to_string();
        }
        info!(predictions = self.predictions.len(), "predictions replaced");
        self.persist();
        Ok(())
    }

    pub fn select_prediction(&mut self, id: &str) -> Result<(), StoreError> {
        self.index_of(id)?;
        self.active_id = id.to_string();
        Ok(())
    }

    /// Copies a prediction under a fresh id, directly after the source, and
    /// activates the copy.
    pub fn duplicate_prediction(&mut self, id: &str) -> Result<&Prediction, StoreError> {
        let index = self.index_of(id)?;
        let mut copy = self.predictions[index].clone();
        copy.id = self.fresh_id();
        copy.name = format!("{} (copy)", copy.name);

        self.active_id = copy.id.clone();
        self.predictions.insert(index + 1, copy);
        self.persist();
        Ok(&self.predictions[index + 1])
    }

    /// Writes one base field on the active prediction and re-derives its
    /// trajectory. Under [`BasePolicy::ConfirmReset`] a prediction with custom
    /// milestones is left unchanged and a proposal is returned instead.
    pub fn update_base_position(
        &mut self,
        field: BaseField,
        value: f64,
    ) -> Result<BaseUpdate, StoreError> {
        check_base_value(field, value)?;

        let index = self.active_index();
        let prediction = &self.predictions[index];
        if self.policy == BasePolicy::ConfirmReset && prediction.milestones.len() > 1 {
            return Ok(BaseUpdate::NeedsConfirmation {
                proposal: BaseResetProposal {
                    prediction_id: prediction.id.clone(),
                    field,
                    value,
                    discarded_milestones: prediction.milestones.len() - 1,
                },
            });
        }

        if field == BaseField::MarketCap {
            let lowest = prediction.milestones[1..]
                .iter()
                .map(|m| m.market_cap)
                .reduce(f64::min);
            if let Some(lowest) = lowest.filter(|&cap| value > cap) {
                return Err(StoreError::InvalidBase(format!(
                    "market cap {value} is above the lowest target {lowest}"
                )));
            }
        }

        self.apply_base(index, field, value);
        self.persist();
        Ok(BaseUpdate::Applied)
    }

    /// Applies a proposal from [`Self::update_base_position`]: the base field
    /// is written and every non-base milestone is discarded.
    pub fn confirm_base_reset(&mut self, proposal: &BaseResetProposal) -> Result<(), StoreError> {
        check_base_value(proposal.field, proposal.value)?;
        let index = self
            .index_of(&proposal.prediction_id)
            .map_err(|_| StoreError::StaleProposal(proposal.prediction_id.clone()))?;

        let prediction = &mut self.predictions[index];
        if prediction.milestones.len() - 1 != proposal.discarded_milestones {
            return Err(StoreError::StaleProposal(proposal.prediction_id.clone()));
        }
        prediction.milestones.truncate(1);
        warn!(
            id = %proposal.prediction_id,
            discarded = proposal.discarded_milestones,
            "base changed, custom milestones discarded"
        );

        self.apply_base(index, proposal.field, proposal.value);
        self.persist();
        Ok(())
    }

    /// Adds a target to the active prediction. Targets below the base market
    /// cap are refused.
    pub fn add_milestone(
        &mut self,
        market_cap: f64,
        profit_percent: f64,
    ) -> Result<&Milestone, StoreError> {
        let index = self.active_index();
        check_target(&self.predictions[index], market_cap, profit_percent)?;

        let prediction = &mut self.predictions[index];
        prediction
            .milestones
            .push(Milestone::target(market_cap, profit_percent));
        rebuild(prediction);
        self.persist();

        let prediction = &self.predictions[index];
        let position = prediction
            .milestones
            .iter()
            .rposition(|m| m.market_cap == market_cap && m.profit_percent == profit_percent)
            .unwrap_or(prediction.milestones.len() - 1);
        Ok(&prediction.milestones[position])
    }

    pub fn remove_milestone(&mut self, index: usize) -> Result<(), StoreError> {
        let active = self.active_index();
        let len = self.predictions[active].milestones.len();
        if index == 0 {
            return Err(StoreError::BaseMilestone);
        }
        if index >= len {
            return Err(StoreError::IndexOutOfRange { index, len });
        }

        let prediction = &mut self.predictions[active];
        prediction.milestones.remove(index);
        rebuild(prediction);
        self.persist();
        Ok(())
    }

    /// Removes the first non-base milestone at exactly `market_cap`.
    pub fn remove_milestone_at_cap(&mut self, market_cap: f64) -> Result<(), StoreError> {
        let index = self
            .active()
            .milestones
            .iter()
            .skip(1)
            .position(|m| m.market_cap == market_cap)
            .map(|i| i + 1)
            .ok_or(StoreError::UnknownMilestone(market_cap))?;
        self.remove_milestone(index)
    }

    /// The milestone `add_milestone` would create, computed without mutating.
    pub fn preview_milestone(
        &self,
        market_cap: f64,
        profit_percent: f64,
    ) -> Result<Milestone, StoreError> {
        let prediction = self.active();
        check_target(prediction, market_cap, profit_percent)?;
        preview_against(&prediction.milestones, market_cap, profit_percent).ok_or_else(|| {
            StoreError::InvalidMilestone("prediction has no base milestone".to_string())
        })
    }

    pub fn export_all(&self) -> String {
        // Predictions hold only finite numbers and strings.
        serde_json::to_string(&self.predictions).unwrap_or_else(|e| {
            warn!(error = %e, "failed to serialize predictions");
            "[]".to_string()
        })
    }

    /// Parses clipboard text and replaces the collection with it. Invalid text
    /// leaves the store unchanged.
    pub fn import_all(&mut self, text: &str) -> Result<(), StoreError> {
        let predictions = parse_predictions(text).inspect_err(|e| {
            warn!(error = %e, "import rejected");
        })?;
        self.replace_all(predictions)
    }

    fn apply_base(&mut self, index: usize, field: BaseField, value: f64) {
        let prediction = &mut self.predictions[index];
        let base = &mut prediction.milestones[0];
        match field {
            BaseField::Holdings => base.holdings = value,
            BaseField::MarketCap => base.market_cap = value,
        }
        rebuild(prediction);
        debug!(id = %prediction.id, ?field, value, "base position updated");
    }

    fn active_index(&self) -> usize {
        self.predictions
            .iter()
            .position(|p| p.id == self.active_id)
            .unwrap_or(0)
    }

    fn index_of(&self, id: &str) -> Result<usize, StoreError> {
        self.predictions
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::UnknownPrediction(id.to_string()))
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.index_of(&id).is_err() {
                return id;
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.repository.save(&self.predictions) {
            warn!(error = %e, "failed to save predictions");
        }
    }
}

fn rebuild(prediction: &mut Prediction) {
    prediction.milestones = build_trajectory(prediction.coin_data(), &prediction.milestones);
}

fn check_base_value(field: BaseField, value: f64) -> Result<(), StoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(StoreError::InvalidBase(format!(
            "{field:?} must be a finite number >= 0"
        )));
    }
    Ok(())
}

fn check_target(
    prediction: &Prediction,
    market_cap: f64,
    profit_percent: f64,
) -> Result<(), StoreError> {
    if !market_cap.is_finite() || market_cap < 0.0 {
        return Err(StoreError::InvalidMilestone(
            "market cap must be a finite number >= 0".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&profit_percent) {
        return Err(StoreError::InvalidMilestone(
            "profit percent must be between 0 and 100".to_string(),
        ));
    }
    let base_cap = prediction.coin_data().market_cap;
    if market_cap < base_cap {
        return Err(StoreError::InvalidMilestone(format!(
            "market cap {market_cap} is below the base market cap {base_cap}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryRepository;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn store() -> PredictionStore<MemoryRepository> {
        PredictionStore::open(MemoryRepository::new(), BasePolicy::Recompute)
    }

    fn stored(store: &PredictionStore<MemoryRepository>) -> Vec<Prediction> {
        let text = store.repository().contents().expect("saved");
        serde_json::from_str(&text).expect("valid")
    }

    fn seeded(policy: BasePolicy) -> PredictionStore<MemoryRepository> {
        let mut store = PredictionStore::open(MemoryRepository::new(), policy);
        store
            .update_base_position(BaseField::Holdings, 100.0)
            .expect("holdings");
        store
            .update_base_position(BaseField::MarketCap, 500_000.0)
            .expect("market cap");
        store.add_milestone(1_000_000.0, 20.0).expect("first");
        store.add_milestone(1_500_000.0, 10.0).expect("second");
        store
    }

    #[test]
    fn open_starts_with_default_prediction_active() {
        let store = store();
        assert_eq!(store.predictions(), default_predictions().as_slice());
        assert_eq!(store.active_id(), "1");
    }

    #[test]
    fn add_prediction_appends_and_activates() {
        let mut store = store();
        let id = store.add_prediction().id().to_string();

        assert_eq!(store.predictions().len(), 2);
        assert_eq!(store.active_id(), id);
        assert_eq!(store.active().name(), "Prediction 2");
        assert_eq!(store.active().milestones().len(), 1);
        assert_eq!(store.active().coin_data(), CoinData::default());
        assert_eq!(stored(&store).len(), 2);
    }

    #[test]
    fn add_prediction_ids_are_unique() {
        let mut store = store();
        for _ in 0..20 {
            store.add_prediction();
        }
        let mut ids: Vec<&str> = store.predictions().iter().map(Prediction::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 21);
    }

    #[test]
    fn remove_last_prediction_is_rejected() {
        let mut store = store();
        assert_eq!(store.remove_prediction("1"), Err(StoreError::LastPrediction));
        assert_eq!(store.predictions().len(), 1);
        assert!(store.repository().contents().is_none());
    }

    #[test]
    fn remove_active_prediction_falls_back_to_first() {
        let mut store = store();
        let second = store.add_prediction().id().to_string();
        store.remove_prediction(&second).expect("removed");

        assert_eq!(store.predictions().len(), 1);
        assert_eq!(store.active_id(), "1");
    }

    #[test]
    fn remove_inactive_prediction_keeps_selection() {
        let mut store = store();
        let second = store.add_prediction().id().to_string();
        store.remove_prediction("1").expect("removed");
        assert_eq!(store.active_id(), second);

        assert_eq!(
            store.remove_prediction("missing"),
            Err(StoreError::UnknownPrediction("missing".to_string()))
        );
    }

    #[test]
    fn rename_prediction_updates_name_only() {
        let mut store = seeded(BasePolicy::Recompute);
        let before = store.active().milestones().to_vec();
        store.rename_prediction("1", "Moon").expect("renamed");

        assert_eq!(store.active().name(), "Moon");
        assert_eq!(store.active().milestones(), before.as_slice());
        assert_eq!(stored(&store)[0].name(), "Moon");
    }

    #[test]
    fn reorder_preserves_predictions_and_active_target() {
        let mut store = seeded(BasePolicy::Recompute);
        let b = store.add_prediction().id().to_string();
        let c = store.add_prediction().id().to_string();
        store.select_prediction("1").expect("select");
        let original = store.predictions().to_vec();

        store.reorder(0, 2).expect("reorder");

        let ids: Vec<&str> = store.predictions().iter().map(Prediction::id).collect();
        assert_eq!(ids, vec![b.as_str(), c.as_str(), "1"]);
        assert_eq!(store.active_id(), "1");
        assert_eq!(store.active(), &original[0]);
        assert_eq!(store.predictions()[2].milestones().len(), 3);

        assert_eq!(
            store.reorder(0, 3),
            Err(StoreError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn select_unknown_prediction_is_a_no_op() {
        let mut store = store();
        assert!(store.select_prediction("nope").is_err());
        assert_eq!(store.active_id(), "1");
    }

    #[test]
    fn duplicate_prediction_copies_plan_under_new_id() {
        let mut store = seeded(BasePolicy::Recompute);
        store.add_prediction();
        let copy_id = store.duplicate_prediction("1").expect("dup").id().to_string();

        assert_ne!(copy_id, "1");
        assert_eq!(store.predictions()[1].id(), copy_id);
        assert_eq!(store.active().name(), "Prediction 1 (copy)");
        assert_eq!(
            store.active().milestones(),
            store.predictions()[0].milestones()
        );
    }

    #[test]
    fn scenario_a_single_milestone() {
        let mut store = store();
        store
            .update_base_position(BaseField::Holdings, 1_000.0)
            .expect("holdings");
        store
            .update_base_position(BaseField::MarketCap, 1_000_000.0)
            .expect("market cap");
        let added = *store.add_milestone(2_000_000.0, 50.0).expect("added");

        assert_approx(added.multiplier, 2.0);
        assert_approx(added.holdings, 2_000.0);
        assert_approx(added.profit, 1_000.0);
    }

    #[test]
    fn scenario_b_uses_pre_sale_holdings_downstream() {
        let store = seeded(BasePolicy::Recompute);
        let m = store.active().milestones();

        assert_approx(m[1].holdings, 200.0);
        assert_approx(m[1].profit, 40.0);
        assert_approx(m[2].multiplier, 1.5);
        assert_approx(m[2].holdings, 300.0);
        assert_approx(m[2].profit, 30.0);
    }

    #[test]
    fn base_update_recomputes_downstream_milestones() {
        let mut store = seeded(BasePolicy::Recompute);
        let outcome = store
            .update_base_position(BaseField::Holdings, 200.0)
            .expect("updated");
        assert_eq!(outcome, BaseUpdate::Applied);

        let prediction = store.active();
        assert_eq!(prediction.coin_data().holdings, 200.0);
        assert_eq!(prediction.milestones().len(), 3);
        assert_approx(prediction.milestones()[1].holdings, 400.0);
        assert_approx(prediction.milestones()[2].holdings, 600.0);
        assert_eq!(stored(&store)[0], *prediction);
    }

    #[test]
    fn base_update_rejects_invalid_values() {
        let mut store = seeded(BasePolicy::Recompute);
        let before = store.active().clone();
        assert!(matches!(
            store.update_base_position(BaseField::MarketCap, f64::NAN),
            Err(StoreError::InvalidBase(_))
        ));
        assert!(store.update_base_position(BaseField::Holdings, -5.0).is_err());
        assert_eq!(store.active(), &before);
    }

    #[test]
    fn base_market_cap_cannot_pass_the_lowest_target() {
        let mut store = seeded(BasePolicy::Recompute);
        let before = store.active().clone();
        assert!(matches!(
            store.update_base_position(BaseField::MarketCap, 2_000_000.0),
            Err(StoreError::InvalidBase(_))
        ));
        assert_eq!(store.active(), &before);
        assert_eq!(stored(&store)[0], before);

        store
            .update_base_position(BaseField::MarketCap, 1_000_000.0)
            .expect("equal to lowest target");
        let caps: Vec<f64> = store
            .active()
            .milestones()
            .iter()
            .map(|m| m.market_cap)
            .collect();
        assert_eq!(caps, vec![1_000_000.0, 1_000_000.0, 1_500_000.0]);
        assert_approx(store.active().milestones()[1].multiplier, 1.0);
    }

    #[test]
    fn confirm_reset_policy_asks_before_discarding() {
        let mut store = seeded(BasePolicy::ConfirmReset);
        let before = store.active().clone();

        let outcome = store
            .update_base_position(BaseField::MarketCap, 250_000.0)
            .expect("proposal");
        let BaseUpdate::NeedsConfirmation { proposal } = outcome else {
            panic!("expected a confirmation request");
        };
        assert_eq!(proposal.discarded_milestones, 2);
        assert_eq!(store.active(), &before);

        store.confirm_base_reset(&proposal).expect("confirmed");
        let prediction = store.active();
        assert_eq!(prediction.milestones().len(), 1);
        assert_eq!(prediction.coin_data().market_cap, 250_000.0);
        assert_eq!(prediction.coin_data().holdings, 100.0);

        assert!(matches!(
            store.confirm_base_reset(&proposal),
            Err(StoreError::StaleProposal(_))
        ));
    }

    #[test]
    fn confirm_reset_policy_applies_directly_without_custom_milestones() {
        let mut store = PredictionStore::open(MemoryRepository::new(), BasePolicy::ConfirmReset);
        let outcome = store
            .update_base_position(BaseField::Holdings, 42.0)
            .expect("applied");
        assert_eq!(outcome, BaseUpdate::Applied);
        assert_eq!(store.active().coin_data().holdings, 42.0);
    }

    #[test]
    fn add_milestone_validates_inputs() {
        let mut store = seeded(BasePolicy::Recompute);
        assert!(store.add_milestone(1_000_000.0, 101.0).is_err());
        assert!(store.add_milestone(1_000_000.0, -1.0).is_err());
        assert!(store.add_milestone(f64::INFINITY, 10.0).is_err());
        assert!(store.add_milestone(100_000.0, 10.0).is_err());
        assert_eq!(store.active().milestones().len(), 3);
    }

    #[test]
    fn add_milestone_keeps_trajectory_sorted() {
        let mut store = seeded(BasePolicy::Recompute);
        let added = *store.add_milestone(750_000.0, 0.0).expect("added");
        assert_approx(added.multiplier, 1.5);

        let caps: Vec<f64> = store
            .active()
            .milestones()
            .iter()
            .map(|m| m.market_cap)
            .collect();
        assert_eq!(caps, vec![500_000.0, 750_000.0, 1_000_000.0, 1_500_000.0]);
    }

    #[test]
    fn remove_milestone_rederives_remaining() {
        let mut store = seeded(BasePolicy::Recompute);
        store.remove_milestone(1).expect("removed");

        let m = store.active().milestones();
        assert_eq!(m.len(), 2);
        assert_approx(m[1].multiplier, 3.0);
        assert_approx(m[1].holdings, 300.0);
        assert_approx(m[1].profit, 30.0);
    }

    #[test]
    fn remove_milestone_rejects_base_and_out_of_range() {
        let mut store = seeded(BasePolicy::Recompute);
        assert_eq!(store.remove_milestone(0), Err(StoreError::BaseMilestone));
        assert_eq!(
            store.remove_milestone(3),
            Err(StoreError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(store.active().milestones().len(), 3);
    }

    #[test]
    fn remove_milestone_at_cap_targets_matching_milestone() {
        let mut store = seeded(BasePolicy::Recompute);
        store.remove_milestone_at_cap(1_500_000.0).expect("removed");
        assert_eq!(store.active().milestones().len(), 2);
        assert_eq!(
            store.remove_milestone_at_cap(500_000.0),
            Err(StoreError::UnknownMilestone(500_000.0))
        );
    }

    #[test]
    fn preview_does_not_mutate() {
        let store = seeded(BasePolicy::Recompute);
        let before = store.repository().contents();
        let preview = store.preview_milestone(3_000_000.0, 50.0).expect("preview");

        assert_approx(preview.multiplier, 2.0);
        assert_approx(preview.holdings, 600.0);
        assert_approx(preview.profit, 300.0);
        assert_eq!(store.active().milestones().len(), 3);
        assert_eq!(store.repository().contents(), before);
    }

    #[test]
    fn predictions_are_isolated() {
        let mut store = seeded(BasePolicy::Recompute);
        store.add_prediction();
        store
            .update_base_position(BaseField::Holdings, 9.0)
            .expect("updated");

        assert_eq!(store.predictions()[0].coin_data().holdings, 100.0);
        assert_eq!(store.predictions()[0].milestones().len(), 3);
    }

    #[test]
    fn export_then_import_restores_collection() {
        let mut store = seeded(BasePolicy::Recompute);
        store.add_prediction();
        let exported = store.export_all();
        let snapshot = store.predictions().to_vec();

        let mut other = PredictionStore::open(MemoryRepository::new(), BasePolicy::Recompute);
        other.import_all(&exported).expect("imported");
        assert_eq!(other.predictions(), snapshot.as_slice());
        assert_eq!(other.active_id(), "1");
    }

    #[test]
    fn invalid_import_leaves_state_unchanged() {
        let mut store = seeded(BasePolicy::Recompute);
        let before = store.predictions().to_vec();
        let saved = store.repository().contents();

        for text in ["not json", "[]", r#"[{"id": "a", "name": "A"}, {"id": "a", "name": "B"}]"#] {
            assert!(matches!(store.import_all(text), Err(StoreError::Import(_))));
        }
        assert_eq!(store.predictions(), before.as_slice());
        assert_eq!(store.repository().contents(), saved);
    }

    #[test]
    fn replace_all_keeps_active_when_present() {
        let mut store = store();
        let second = store.add_prediction().id().to_string();
        let replacement = vec![
            Prediction::new("x", "X", CoinData::default()),
            Prediction::new(second.clone(), "Kept", CoinData::default()),
        ];

        store.replace_all(replacement).expect("replaced");
        assert_eq!(store.active_id(), second);

        store
            .replace_all(vec![Prediction::new("y", "Y", CoinData::default())])
            .expect("replaced");
        assert_eq!(store.active_id(), "y");
    }

    #[test]
    fn reopening_restores_saved_state() {
        let store = seeded(BasePolicy::Recompute);
        let text = store.repository().contents().expect("saved");
        let reopened =
            PredictionStore::open(MemoryRepository::with_contents(text), BasePolicy::Recompute);
        assert_eq!(reopened.predictions(), store.predictions());
    }
}
