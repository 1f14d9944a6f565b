//! Record persistence
//!
//! Daily records live under a single key as a date-keyed JSON object; plans
//! are stored one key per day; the trained risk models are one versioned blob.

pub mod kv;

pub use kv::{FileKv, KvStore, MemoryKv};

use crate::error::BalanceError;
use crate::plan::SavedPlan;
use crate::risk::DualModels;
use crate::types::{DailyRecord, RecordPatch};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Key holding all daily records
pub const RECORDS_KEY: &str = "balance_daily_records_v1";

/// Prefix for per-day plan snapshots
pub const PLAN_KEY_PREFIX: &str = "balance_plan_v1:";

/// Key holding the trained risk models
pub const MODELS_KEY: &str = "balance_risk_models_v1";

/// Suffix of the key a corrupt payload is copied to
pub const CORRUPT_BACKUP_SUFFIX: &str = ":corrupt_backup";

/// Per-date record store
pub trait Repository {
    fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>, BalanceError>;

    /// All records, ascending by date
    fn list(&self) -> Result<Vec<DailyRecord>, BalanceError>;

    /// Field-merge `patch` into the record for `date`, creating it if needed
    fn upsert(&self, date: NaiveDate, patch: RecordPatch) -> Result<DailyRecord, BalanceError>;

    /// Apply many patches in one write
    fn upsert_many(&self, patches: Vec<(NaiveDate, RecordPatch)>) -> Result<usize, BalanceError>;

    fn delete_all(&self) -> Result<(), BalanceError>;

    fn save_plan(&self, plan: &SavedPlan) -> Result<(), BalanceError>;

    fn load_plan(&self, date: NaiveDate) -> Result<Option<SavedPlan>, BalanceError>;

    /// The most recent `days` plans, ascending by date
    fn list_plans(&self, days: usize) -> Result<Vec<SavedPlan>, BalanceError>;

    fn clear_plans(&self) -> Result<(), BalanceError>;

    fn load_models(&self) -> Result<Option<DualModels>, BalanceError>;

    fn save_models(&self, models: &DualModels) -> Result<(), BalanceError>;
}

type Records = BTreeMap<NaiveDate, DailyRecord>;

/// `Repository` over any `KvStore`
#[derive(Debug)]
pub struct KvRepository<K: KvStore> {
    kv: K,
}

impl<K: KvStore> KvRepository<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Load all records.
    ///
    /// An unreadable or non-object payload is quarantined whole and the store
    /// starts empty. Individual entries that fail to parse are moved to the
    /// backup key and the rest are kept.
    fn load_records(&self) -> Result<Records, BalanceError> {
        let Some(raw) = self.kv.get_item(RECORDS_KEY)? else {
            return Ok(Records::new());
        };
        let backup_key = format!("{RECORDS_KEY}{CORRUPT_BACKUP_SUFFIX}");

        let entries = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(entries)) => entries,
            Ok(_) => {
                warn!(key = RECORDS_KEY, backup = %backup_key, "record store is not a JSON object, quarantined");
                self.kv.set_item(&backup_key, &raw)?;
                return Ok(Records::new());
            }
            Err(e) => {
                warn!(key = RECORDS_KEY, backup = %backup_key, error = %e, "quarantined corrupt record store");
                self.kv.set_item(&backup_key, &raw)?;
                return Ok(Records::new());
            }
        };

        let mut records = Records::new();
        let mut rejected = serde_json::Map::new();
        for (key, value) in entries {
            let parsed = key
                .parse::<NaiveDate>()
                .map_err(|e| e.to_string())
                .and_then(|date| {
                    serde_json::from_value::<DailyRecord>(value.clone())
                        .map(|record| (date, record))
                        .map_err(|e| e.to_string())
                });
            match parsed {
                Ok((date, record)) => {
                    records.insert(date, record);
                }
                Err(reason) => {
                    warn!(date = %key, %reason, "quarantined unreadable record");
                    rejected.insert(key, value);
                }
            }
        }

        if !rejected.is_empty() {
            let mut backup = match self.kv.get_item(&backup_key)? {
                Some(previous) => match serde_json::from_str::<serde_json::Value>(&previous) {
                    Ok(serde_json::Value::Object(previous)) => previous,
                    _ => serde_json::Map::new(),
                },
                None => serde_json::Map::new(),
            };
            backup.extend(rejected);
            self.kv
                .set_item(&backup_key, &serde_json::Value::Object(backup).to_string())?;
        }
        Ok(records)
    }

    fn save_records(&self, records: &Records) -> Result<(), BalanceError> {
        self.kv.set_item(RECORDS_KEY, &serde_json::to_string(records)?)
    }

    fn plan_keys(&self) -> Result<Vec<String>, BalanceError> {
        Ok(self
            .kv
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(PLAN_KEY_PREFIX))
            .collect())
    }
}

impl<K: KvStore> Repository for KvRepository<K> {
    fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>, BalanceError> {
        Ok(self.load_records()?.remove(&date))
    }

    fn list(&self) -> Result<Vec<DailyRecord>, BalanceError> {
        Ok(self.load_records()?.into_values().collect())
    }

    fn upsert(&self, date: NaiveDate, patch: RecordPatch) -> Result<DailyRecord, BalanceError> {
        let mut records = self.load_records()?;
        let record = records.entry(date).or_insert_with(|| DailyRecord::new(date));
        patch.apply(record);
        let updated = record.clone();
        self.save_records(&records)?;
        Ok(updated)
    }

    fn upsert_many(&self, patches: Vec<(NaiveDate, RecordPatch)>) -> Result<usize, BalanceError> {
        let mut records = self.load_records()?;
        let count = patches.len();
        for (date, patch) in patches {
            patch.apply(records.entry(date).or_insert_with(|| DailyRecord::new(date)));
        }
        self.save_records(&records)?;
        Ok(count)
    }

    fn delete_all(&self) -> Result<(), BalanceError> {
        self.kv.remove_item(RECORDS_KEY)
    }

    fn save_plan(&self, plan: &SavedPlan) -> Result<(), BalanceError> {
        self.kv
            .set_item(&format!("{PLAN_KEY_PREFIX}{}", plan.date), &serde_json::to_string(plan)?)?;
        info!(date = %plan.date, category = %plan.category, "saved plan");
        Ok(())
    }

    fn load_plan(&self, date: NaiveDate) -> Result<Option<SavedPlan>, BalanceError> {
        match self.kv.get_item(&format!("{PLAN_KEY_PREFIX}{date}"))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn list_plans(&self, days: usize) -> Result<Vec<SavedPlan>, BalanceError> {
        let keys = self.plan_keys()?;
        let start = keys.len().saturating_sub(days);
        let mut plans = Vec::new();
        for key in &keys[start..] {
            if let Some(raw) = self.kv.get_item(key)? {
                match serde_json::from_str::<SavedPlan>(&raw) {
                    Ok(plan) => plans.push(plan),
                    Err(e) => warn!(%key, error = %e, "skipping unreadable plan"),
                }
            }
        }
        plans.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(plans)
    }

    fn clear_plans(&self) -> Result<(), BalanceError> {
        for key in self.plan_keys()? {
            self.kv.remove_item(&key)?;
        }
        Ok(())
    }

    /// Stored models, or `None` when absent or unreadable (quarantined)
    fn load_models(&self) -> Result<Option<DualModels>, BalanceError> {
        let Some(raw) = self.kv.get_item(MODELS_KEY)? else {
            return Ok(None);
        };
        match DualModels::from_json(&raw) {
            Ok(models) => Ok(Some(models)),
            Err(e) => {
                let backup_key = format!("{MODELS_KEY}{CORRUPT_BACKUP_SUFFIX}");
                warn!(key = MODELS_KEY, backup = %backup_key, error = %e, "quarantined unreadable risk models");
                self.kv.set_item(&backup_key, &raw)?;
                self.kv.remove_item(MODELS_KEY)?;
                Ok(None)
            }
        }
    }

    fn save_models(&self, models: &DualModels) -> Result<(), BalanceError> {
        self.kv.set_item(MODELS_KEY, &models.to_json()?)?;
        info!(run_id = %models.run_id, rows = models.rows_used, "saved risk models");
        Ok(())
    }
}
