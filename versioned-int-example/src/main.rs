use std::{fs, path::Path, time::Instant};

use anyhow::{anyhow, Result};
use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::{fmt, EnvFilter};
use versioned_int::{
    append, apply_retention, decode, encode, ordering, Config, HistoryStore, IndexQuery,
    QueryPoint, RangeQuery, RetentionPolicy, SpatialIndex, Timestamp, TransactionContext,
    VersionedIntError,
};

const SENSORS: i64 = 50;
const READINGS: u32 = 48;

fn setup_logging() {
    let filter = EnvFilter::from_default_env()
        .add_directive("versioned_int_example=info".parse().unwrap())
        .add_directive("versioned_int=info".parse().unwrap());

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init();
}

fn write_config(dir: &Path) -> Result<Config> {
    let path = dir.join("versioned-int.json");
    fs::write(
        &path,
        r#"{ "store": { "max_bytes": 520 }, "index": { "max_fanout": 6 } }"#,
    )?;
    let config = Config::load(&path)?;
    info!(?path, ?config, "Loaded configuration");
    Ok(config)
}

/// One transaction per half hour starting at midnight.
fn transaction(reading: u32) -> Result<TransactionContext> {
    let start = Utc
        .with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| anyhow!("Invalid start date"))?;
    let dt = start + Duration::minutes(30 * i64::from(reading));
    Ok(TransactionContext::at(Timestamp::from(dt)))
}

/// Sensor `s` reads around `10 * s`, drifting by the reading number.
fn reading_value(sensor: i64, reading: u32) -> i64 {
    sensor * 10 + i64::from(reading % 7)
}

fn record_readings(config: &Config) -> Result<Vec<HistoryStore>> {
    let _span = info_span!("record_readings", sensors = SENSORS, readings = READINGS).entered();
    let mut stores: Vec<Option<HistoryStore>> = vec![None; SENSORS as usize];
    for reading in 0..READINGS {
        let ctx = transaction(reading)?;
        for (sensor, slot) in stores.iter_mut().enumerate() {
            let value = reading_value(sensor as i64, reading);
            match append(slot.as_ref(), Some(value), None, &ctx, config.store) {
                Ok(store) => *slot = Some(store),
                Err(VersionedIntError::CapacityExceeded { requested, max }) => {
                    // Keep the last good handle and make room before retrying.
                    warn!(sensor, requested, max, "Store full, trimming to the newest half");
                    let full = slot.as_ref().ok_or_else(|| anyhow!("Empty store reported full"))?;
                    let keep = (full.len() / 2) as u32;
                    let trimmed = apply_retention(full, RetentionPolicy::KeepLastN(keep), &ctx);
                    *slot = Some(append(Some(&trimmed), Some(value), None, &ctx, config.store)?);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    stores
        .into_iter()
        .map(|store| store.ok_or_else(|| anyhow!("Sensor without readings")))
        .collect()
}

fn main() -> Result<()> {
    setup_logging();

    let temp_dir = tempdir()?;
    let config = write_config(temp_dir.path())?;

    let started = Instant::now();
    let mut stores = record_readings(&config)?;
    info!(
        sensors = stores.len(),
        entries = stores.iter().map(HistoryStore::len).sum::<usize>(),
        elapsed = ?started.elapsed(),
        "Recorded readings"
    );

    let mut index = SpatialIndex::new(config.index)?;
    for (sensor, store) in stores.iter().enumerate() {
        index.insert(sensor, store)?;
    }
    info!(len = index.len(), height = index.height(), root = ?index.root_box(), "Built index");

    // Which sensor read 125 at 20:00?
    let at = transaction(40)?.now();
    let query = QueryPoint::new(at, 125).resolve()?;
    let hits = index.search(&query);
    let confirmed: Vec<usize> = hits
        .iter()
        .filter(|hit| !hit.recheck || query.recheck(&stores[*hit.key]))
        .map(|hit| *hit.key)
        .collect();
    info!(%at, candidates = hits.len(), ?confirmed, "Point query");

    // Who read between 200 and 205 from 20:00 to 22:00?
    let range = RangeQuery::new((transaction(40)?.now(), transaction(44)?.now()), (200, 205));
    let confirmed: Vec<usize> = index
        .search(&range)
        .into_iter()
        .filter(|hit| !hit.recheck || range.recheck(&stores[*hit.key]))
        .map(|hit| *hit.key)
        .collect();
    info!(?confirmed, "Range query");

    // Keep only the last six hours, then re-index.
    let now = transaction(READINGS)?;
    let policy = RetentionPolicy::from_selector('s', 6 * 60 * 60)?;
    for (sensor, store) in stores.iter_mut().enumerate() {
        let trimmed = apply_retention(store, policy, &now);
        debug!(sensor, before = store.len(), after = trimmed.len(), "Applied retention");
        *store = trimmed;
        index.update(sensor, store)?;
    }
    info!(
        ?policy,
        entries = stores.iter().map(HistoryStore::len).sum::<usize>(),
        "Applied retention"
    );

    let bytes = encode(&stores[0])?;
    let restored = decode(&bytes, config.store)?;
    info!(
        bytes = bytes.len(),
        entries = restored.len(),
        current = ?restored.current_value(),
        "Encoded and decoded sensor 0"
    );

    let mut by_current: Vec<&HistoryStore> = stores.iter().collect();
    by_current.sort_by(|a, b| ordering::compare(*a, *b));
    let lowest = by_current.first().and_then(|s| s.current_value());
    let highest = by_current.last().and_then(|s| s.current_value());
    info!(?lowest, ?highest, "Sorted sensors by current value");

    info!("Example finished.");
    Ok(())
}
