//! Engine orchestration
//!
//! `BalanceEngine` runs the load → compute → persist sequences over a
//! `Repository`: scoring a day, planning it, explaining it, and keeping the
//! personal risk models fresh.

use crate::adapters::{ImportError, NormalizedCsvAdapter, WearableImportAdapter};
use crate::analytics::{build_analytics_summary, AnalyticsSummary};
use crate::baseline::{compute_baseline_meta, BaselineMeta};
use crate::config::EngineConfig;
use crate::consistency::{compute_consistency_at, ConsistencyOutput};
use crate::error::BalanceError;
use crate::explain::{build_patterns, explain_day, DayExplanation, PatternItem};
use crate::export::{daily_csv, plans_json, research_json};
use crate::narrative::{narrate, ExplanationRequest, ExplanationService};
use crate::plan::{generate_plan, is_balance_drop, GeneratedPlan, PlanInput, SavedPlan};
use crate::risk::{predict_tomorrow, train_if_ready, RiskPrediction, TrainOutcome};
use crate::score::{score, ScoreInput, ScoreResult};
use crate::store::{KvRepository, MemoryKv, Repository};
use crate::types::{records_up_to, CheckIn, DailyRecord, RecordPatch, WearableMetrics, WearableSource};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything recomputed when a day's inputs change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRefresh {
    pub date: NaiveDate,
    pub score: ScoreResult,
    pub baseline: BaselineMeta,
    pub plan: GeneratedPlan,
    /// Index fell below 85% of the baseline
    pub balance_drop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

/// Result of a wearable file import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub errors: Vec<ImportError>,
    /// Days whose index and plan were recomputed
    pub refreshed: Vec<NaiveDate>,
    /// Risk models were retrained after the import
    pub models_trained: bool,
}

/// Stateful engine over a repository
pub struct BalanceEngine<R: Repository> {
    repo: R,
    config: EngineConfig,
    narrator: Option<Box<dyn ExplanationService>>,
}

impl BalanceEngine<KvRepository<MemoryKv>> {
    /// Engine over an empty in-memory store with default settings
    pub fn in_memory() -> Self {
        Self::new(KvRepository::new(MemoryKv::new()), EngineConfig::default())
    }
}

impl<R: Repository> BalanceEngine<R> {
    pub fn new(repo: R, config: EngineConfig) -> Self {
        Self {
            repo,
            config,
            narrator: None,
        }
    }

    /// Narrate each saved plan with `service`
    pub fn with_narrator(mut self, service: Box<dyn ExplanationService>) -> Self {
        self.narrator = Some(service);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Save a check-in, refresh the day and retrain when enough history exists
    pub fn record_check_in(&self, date: NaiveDate, check_in: CheckIn) -> Result<Option<DayRefresh>, BalanceError> {
        self.repo.upsert(date, RecordPatch::check_in(check_in))?;
        self.refresh_and_train(date)
    }

    /// Save wearable metrics, refresh the day and retrain when enough history exists
    pub fn record_wearable(
        &self,
        date: NaiveDate,
        wearable: WearableMetrics,
        source: Option<WearableSource>,
    ) -> Result<Option<DayRefresh>, BalanceError> {
        self.repo.upsert(date, RecordPatch::wearable(wearable, source))?;
        self.refresh_and_train(date)
    }

    fn refresh_and_train(&self, date: NaiveDate) -> Result<Option<DayRefresh>, BalanceError> {
        let refresh = self.refresh_day(date)?;
        if refresh.is_some() {
            self.train_if_ready()?;
        }
        Ok(refresh)
    }

    /// Import a normalized wearable CSV and refresh every imported day
    pub fn import_wearable_csv(&self, csv: &str) -> Result<ImportSummary, BalanceError> {
        let adapter = NormalizedCsvAdapter;
        let outcome = adapter.parse(csv);

        if outcome.is_rejected() {
            let messages: Vec<&str> = outcome.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(BalanceError::ImportRejected(messages.join("; ")));
        }

        let dates: Vec<NaiveDate> = outcome.days.iter().map(|d| d.date).collect();
        let patches = outcome
            .days
            .into_iter()
            .map(|d| (d.date, RecordPatch::wearable(d.wearable, Some(d.source))))
            .collect();
        let imported = self.repo.upsert_many(patches)?;
        info!(imported, errors = outcome.errors.len(), "imported wearable days");

        let mut refreshed = Vec::new();
        for date in dates {
            if self.refresh_day(date)?.is_some() {
                refreshed.push(date);
            }
        }
        let models_trained = !refreshed.is_empty() && self.train_if_ready()?.models().is_some();

        Ok(ImportSummary {
            imported,
            errors: outcome.errors,
            refreshed,
            models_trained,
        })
    }

    /// Score, persist, plan and save a day. `None` when the day has no wearable data.
    pub fn refresh_day(&self, date: NaiveDate) -> Result<Option<DayRefresh>, BalanceError> {
        let Some(record) = self.repo.get(date)? else {
            debug!(%date, "refresh skipped: no record");
            return Ok(None);
        };
        let Some(wearable) = record.wearable else {
            debug!(%date, "refresh skipped: no wearable data");
            return Ok(None);
        };

        let result = score(&ScoreInput::new(
            wearable.recovery,
            wearable.sleep_hours,
            wearable.strain,
            record.check_in.clone(),
        ));
        self.repo.upsert(date, RecordPatch::index(result.index, result.meta()))?;
        debug!(%date, index = result.index, confidence = %result.confidence, "scored day");

        let baseline = self.baseline_meta(date)?;
        let input = PlanInput {
            index: result.index,
            baseline: baseline.baseline,
            classification: result.classification,
            confidence: result.confidence,
            wearable,
            check_in: record.check_in,
        };
        let plan = generate_plan(&input);
        let saved = SavedPlan::from_generated(date, &input, &plan);
        self.repo.save_plan(&saved)?;

        let narrative = self
            .narrator
            .as_deref()
            .and_then(|service| narrate(service, &ExplanationRequest::for_plan(&saved)));

        Ok(Some(DayRefresh {
            date,
            balance_drop: is_balance_drop(result.index, baseline.baseline),
            score: result,
            baseline,
            plan,
            narrative,
        }))
    }

    /// Baseline as of `date` (records after it are ignored)
    pub fn baseline_meta(&self, date: NaiveDate) -> Result<BaselineMeta, BalanceError> {
        let history = records_up_to(&self.repo.list()?, date, 0);
        Ok(compute_baseline_meta(&history, self.config.plan_baseline_days))
    }

    pub fn explain_day(&self, date: NaiveDate) -> Result<DayExplanation, BalanceError> {
        let record = self.repo.get(date)?;
        let baseline = self.baseline_meta(date)?.baseline;
        Ok(explain_day(date, record.as_ref(), baseline))
    }

    /// Patterns over the configured window ending at `end`
    pub fn patterns(&self, end: NaiveDate) -> Result<Vec<PatternItem>, BalanceError> {
        let window = records_up_to(&self.repo.list()?, end, self.config.pattern_window_days);
        Ok(build_patterns(&window))
    }

    pub fn analytics(&self) -> Result<AnalyticsSummary, BalanceError> {
        let records = self.repo.list()?;
        Ok(build_analytics_summary(
            &records,
            self.config.analytics_window_days,
            Utc::now(),
        ))
    }

    pub fn consistency(&self, end: NaiveDate) -> Result<ConsistencyOutput, BalanceError> {
        let records = self.repo.list()?;
        Ok(compute_consistency_at(
            &records,
            end,
            self.config.consistency_window_days,
        ))
    }

    /// Retrain the risk models when enough history exists, persisting on success
    pub fn train_if_ready(&self) -> Result<TrainOutcome, BalanceError> {
        let records = self.repo.list()?;
        let outcome = train_if_ready(&records, &self.config.dataset, &self.config.training);
        if let Some(models) = outcome.models() {
            self.repo.save_models(models)?;
        }
        Ok(outcome)
    }

    pub fn predict_tomorrow(&self) -> Result<RiskPrediction, BalanceError> {
        let records = self.repo.list()?;
        let models = self.repo.load_models()?;
        Ok(predict_tomorrow(&records, models.as_ref(), &self.config.dataset))
    }

    pub fn records(&self, days: usize) -> Result<Vec<DailyRecord>, BalanceError> {
        let records = self.repo.list()?;
        let start = if days == 0 { 0 } else { records.len().saturating_sub(days) };
        Ok(records[start..].to_vec())
    }

    /// Flat daily CSV of the last `days` records (0 for all)
    pub fn export_daily_csv(&self, days: usize) -> Result<String, BalanceError> {
        let records = self.records(days)?;
        let plans = self.repo.list_plans(if days == 0 { usize::MAX } else { days })?;
        daily_csv(&records, &plans)
    }

    pub fn export_plans_json(&self, days: usize) -> Result<String, BalanceError> {
        let plans = self.repo.list_plans(days)?;
        Ok(plans_json(&plans, days, Utc::now())?)
    }

    /// Records and plans of the last `days` days as one JSON document (0 for all)
    pub fn export_research_json(&self, days: usize) -> Result<String, BalanceError> {
        let records = self.records(days)?;
        let plans = self.repo.list_plans(if days == 0 { usize::MAX } else { days })?;
        Ok(research_json(&records, &plans, days, Utc::now())?)
    }

    /// Remove all records and plans
    pub fn reset(&self) -> Result<(), BalanceError> {
        self.repo.delete_all()?;
        self.repo.clear_plans()?;
        info!("cleared all records and plans");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::RuleNarrator;
    use crate::risk::dataset::tests::make_test_history;
    use crate::store::{KvStore, MODELS_KEY};
    use crate::types::{Confidence, Level, PlanCategory, StressIndicators};
    use chrono::Duration;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_test_engine() -> BalanceEngine<KvRepository<MemoryKv>> {
        BalanceEngine::in_memory()
    }

    #[test]
    fn test_check_in_without_wearable_is_not_scored() {
        let engine = make_test_engine();
        let refresh = engine
            .record_check_in(
                date("2026-01-01"),
                CheckIn::new(Level::new(3).unwrap(), StressIndicators::default()),
            )
            .unwrap();
        assert!(refresh.is_none());
        assert!(engine.repository().get(date("2026-01-01")).unwrap().unwrap().index.is_none());
    }

    #[test]
    fn test_wearable_then_check_in_refreshes() {
        let engine = make_test_engine();
        let day = date("2026-01-01");

        let first = engine
            .record_wearable(day, WearableMetrics::new(62.0, 7.4, Some(11.2)), None)
            .unwrap()
            .unwrap();
        assert_eq!(first.score.index, 55);
        assert_eq!(first.score.confidence, Confidence::Medium);
        assert!(first.baseline.baseline.is_none());

        let second = engine
            .record_check_in(day, CheckIn::new(Level::new(4).unwrap(), StressIndicators::default()))
            .unwrap()
            .unwrap();
        assert_eq!(second.score.confidence, Confidence::High);

        let stored = engine.repository().get(day).unwrap().unwrap();
        assert_eq!(stored.index, Some(second.score.index));
        let plan = engine.repository().load_plan(day).unwrap().unwrap();
        assert_eq!(plan.index, second.score.index);
    }

    #[test]
    fn test_import_csv_refreshes_days() {
        let engine = make_test_engine();
        let csv = "date,sleep_hours,recovery,strain\n\
                   01-Jan-26,7.5,70,10\n\
                   02-Jan-26,7.0,65,12\n\
                   03-Jan-26,6.0,30,16\n\
                   04-Jan-26,7.5,150,\n";
        let summary = engine.import_wearable_csv(csv).unwrap();

        assert_eq!(summary.imported, 3);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.refreshed.len(), 3);
        assert!(!summary.models_trained);

        let explanation = engine.explain_day(date("2026-01-03")).unwrap();
        assert_eq!(explanation.baseline, engine.baseline_meta(date("2026-01-03")).unwrap().baseline);
        assert!(explanation.baseline.is_some());

        let plan = engine.repository().load_plan(date("2026-01-03")).unwrap().unwrap();
        assert_eq!(plan.category, PlanCategory::Recovery);
    }

    #[test]
    fn test_import_rejects_bad_header() {
        let engine = make_test_engine();
        let err = engine.import_wearable_csv("date,recovery\n01-Jan-26,70\n").unwrap_err();
        assert!(matches!(err, BalanceError::ImportRejected(_)));
    }

    #[test]
    fn test_baseline_ignores_later_days() {
        let engine = make_test_engine();
        let start = date("2026-02-01");
        for offset in 0..5 {
            engine
                .record_wearable(
                    start + Duration::days(offset),
                    WearableMetrics::new(40.0 + offset as f64 * 10.0, 7.5, None),
                    None,
                )
                .unwrap();
        }
        let early = engine.baseline_meta(start + Duration::days(1)).unwrap();
        assert_eq!(early.days_used, 2);
        assert!(early.baseline.is_none());
        assert_eq!(engine.baseline_meta(start + Duration::days(4)).unwrap().days_used, 5);
    }

    #[test]
    fn test_train_and_predict() {
        let engine = make_test_engine();
        for record in make_test_history(25) {
            let mut patch = RecordPatch::index(
                record.index.unwrap(),
                score(&ScoreInput::new(0.0, 0.0, None, None)).meta(),
            );
            patch.wearable = record.wearable;
            patch.check_in = record.check_in;
            engine.repository().upsert(record.date, patch).unwrap();
        }

        assert!(!engine.predict_tomorrow().unwrap().trained);

        let outcome = engine.train_if_ready().unwrap();
        assert!(outcome.models().is_some());
        assert!(engine.repository().load_models().unwrap().is_some());

        let prediction = engine.predict_tomorrow().unwrap();
        assert!(prediction.trained);
        assert!(prediction.recovery_risk_prob.is_some());
    }

    #[test]
    fn test_predict_survives_unreadable_models() {
        let engine = make_test_engine();
        for record in make_test_history(5) {
            let mut patch = RecordPatch::check_in(record.check_in.clone().unwrap());
            patch.wearable = record.wearable;
            engine.repository().upsert(record.date, patch).unwrap();
        }
        engine.repository().kv().set_item(MODELS_KEY, "{bad").unwrap();

        let prediction = engine.predict_tomorrow().unwrap();
        assert!(!prediction.trained);
    }

    #[test]
    fn test_recording_a_day_retrains_opportunistically() {
        let engine = make_test_engine();
        let history = make_test_history(25);
        for record in &history {
            let mut patch = RecordPatch::check_in(record.check_in.clone().unwrap());
            patch.wearable = record.wearable;
            engine.repository().upsert(record.date, patch).unwrap();
            engine.refresh_day(record.date).unwrap();
        }
        assert!(engine.repository().load_models().unwrap().is_none());

        let next = history[24].date + Duration::days(1);
        engine
            .record_check_in(next, CheckIn::new(Level::new(3).unwrap(), StressIndicators::default()))
            .unwrap();
        engine
            .record_wearable(next, WearableMetrics::new(55.0, 7.0, Some(10.0)), None)
            .unwrap();
        assert!(engine.repository().load_models().unwrap().is_some());
    }

    #[test]
    fn test_short_history_does_not_persist_models() {
        let engine = make_test_engine();
        engine
            .record_wearable(date("2026-03-01"), WearableMetrics::new(60.0, 7.0, None), None)
            .unwrap();
        let outcome = engine.train_if_ready().unwrap();
        assert!(outcome.models().is_none());
        assert!(engine.repository().load_models().unwrap().is_none());
    }

    #[test]
    fn test_narrator_and_exports() {
        let engine = make_test_engine().with_narrator(Box::new(RuleNarrator));
        let refresh = engine
            .record_wearable(date("2026-04-01"), WearableMetrics::new(80.0, 8.0, Some(9.0)), None)
            .unwrap()
            .unwrap();
        assert!(refresh.narrative.unwrap().starts_with("Today's focus:"));

        let csv = engine.export_daily_csv(0).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(engine.export_plans_json(7).unwrap().contains("\"data\""));

        let research: serde_json::Value = serde_json::from_str(&engine.export_research_json(0).unwrap()).unwrap();
        assert_eq!(research["records"].as_array().map(Vec::len), Some(1));
        assert_eq!(research["plans"].as_array().map(Vec::len), Some(1));
        assert_eq!(research["records"][0]["date"], "2026-04-01");

        engine.reset().unwrap();
        assert!(engine.records(0).unwrap().is_empty());
        assert!(engine.repository().list_plans(7).unwrap().is_empty());
    }

    #[test]
    fn test_analytics_patterns_consistency() {
        let engine = make_test_engine();
        for record in make_test_history(10) {
            let mut patch = RecordPatch::check_in(record.check_in.clone().unwrap());
            patch.wearable = record.wearable;
            engine.repository().upsert(record.date, patch).unwrap();
            engine.refresh_day(record.date).unwrap();
        }
        let end = date("2026-01-10");

        let summary = engine.analytics().unwrap();
        assert_eq!(summary.n_days_total, 10);
        assert_eq!(summary.n_days_with_index, 10);

        assert!(!engine.patterns(end).unwrap().is_empty());
        assert_eq!(engine.consistency(end).unwrap().days, 10);
    }
}
