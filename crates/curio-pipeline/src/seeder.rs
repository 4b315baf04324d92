use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, info, warn};

use curio_core::error::{CurioError, Result};
use curio_core::record::{NegativeAssertionEntry, TermRecord};
use curio_core::storage;
use curio_core::traits::TextAgent;

use crate::parse::{expect_object, value_text};
use crate::prompts::injection_prompt;

const STAGE: &str = "seed_false_assertions";

/// Counters from the most recent seeding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub cache_hits: usize,
    pub injected: usize,
    pub untouched: usize,
}

/// Injects synthetic false assertions into definitions.
///
/// Every generation is appended to a JSON array cache keyed by `cell_id`.
/// A cached record is rewritten from the cache without another agent call,
/// so re-runs reproduce earlier mutations at no cost.
pub struct NegativeSeeder {
    agent: Arc<dyn TextAgent>,
    cache_file: PathBuf,
    probability: f64,
    rng: StdRng,
    stats: SeedStats,
}

impl NegativeSeeder {
    pub fn new(
        agent: Arc<dyn TextAgent>,
        cache_file: impl Into<PathBuf>,
        probability: f64,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            agent,
            cache_file: cache_file.into(),
            probability,
            rng,
            stats: SeedStats::default(),
        }
    }

    pub fn stats(&self) -> SeedStats {
        self.stats
    }

    /// Return `records` in order, each unchanged or with its definition replaced.
    pub async fn seed_definitions(&mut self, records: &[TermRecord]) -> Result<Vec<TermRecord>> {
        let mut cache = self.load_cache().await?;
        let mut stats = SeedStats::default();
        let mut seeded = Vec::with_capacity(records.len());

        for record in records {
            if let Some(entry) = lookup(&cache, &record.id) {
                stats.cache_hits += 1;
                match entry.as_ref().and_then(|e| e.replacement_definition()) {
                    Some(definition) => seeded.push(record.with_definition(definition)),
                    None => seeded.push(record.clone()),
                }
                debug!(record_id = %record.id, "Negative assertion cache hit");
                continue;
            }

            if self.rng.gen::<f64>() >= self.probability {
                stats.untouched += 1;
                seeded.push(record.clone());
                continue;
            }

            let (entry, definition) = self.generate(record).await?;
            cache.push(entry);
            stats.injected += 1;
            seeded.push(record.with_definition(definition));
        }

        storage::write_json(&self.cache_file, &cache).await?;
        self.stats = stats;

        info!(
            records = seeded.len(),
            cache_hits = stats.cache_hits,
            injected = stats.injected,
            untouched = stats.untouched,
            "Seeded definitions with synthetic negatives"
        );
        Ok(seeded)
    }

    async fn generate(&self, record: &TermRecord) -> Result<(Value, String)> {
        let reply = self.agent.run(injection_prompt(record)).await?;
        let data = expect_object(
            STAGE,
            &record.id,
            &reply,
            &["updated_definition", "false_assertion"],
        )?;

        let entry = NegativeAssertionEntry {
            cell_id: record.id.clone(),
            label: record.name.clone(),
            false_assertion: Some(value_text(&data["false_assertion"])),
            updated_definition: Some(value_text(&data["updated_definition"])),
        };
        // Same selection rule as a cache hit
        let definition = entry
            .replacement_definition()
            .map(str::to_string)
            .ok_or_else(|| {
                CurioError::contract(STAGE, &record.id, "reply has no usable definition text")
            })?;
        info!(record_id = %record.id, "Generated false assertion");

        Ok((serde_json::to_value(&entry)?, definition))
    }

    async fn load_cache(&self) -> Result<Vec<Value>> {
        if !storage::exists(&self.cache_file).await {
            return Ok(Vec::new());
        }
        match storage::read_json::<Value>(&self.cache_file).await? {
            Value::Array(entries) => Ok(entries),
            _ => {
                warn!(
                    path = %self.cache_file.display(),
                    "Negative assertion cache is not a JSON array, starting empty"
                );
                Ok(Vec::new())
            }
        }
    }
}

/// First entry whose `cell_id` matches. The outer `Option` is the hit; the
/// inner one is `None` when the entry does not decode.
fn lookup(cache: &[Value], record_id: &str) -> Option<Option<NegativeAssertionEntry>> {
    let raw = cache
        .iter()
        .find(|entry| entry.get("cell_id").and_then(Value::as_str) == Some(record_id))?;
    match serde_json::from_value(raw.clone()) {
        Ok(entry) => Some(Some(entry)),
        Err(e) => {
            warn!(record_id, error = %e, "Unreadable negative assertion cache entry");
            Some(None)
        }
    }
}
