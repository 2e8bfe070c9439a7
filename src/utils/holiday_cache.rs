use anyhow::Result;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::engine::calendar;
use crate::model::holiday::Holiday;

/// (company_id, date-key) -> is that local date a holiday for the company.
/// Bounded with a TTL so a long-running multi-tenant process never grows
/// it without limit; expired entries are evicted on insert when full.
pub static HOLIDAY_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(3600)) // 1h TTL
        .support_invalidation_closures()
        .build()
});

fn cache_key(company_id: u64, date_key: &str) -> String {
    format!("{company_id}:{date_key}")
}

/// Holiday-membership test for a single company-local date, backed by the
/// cache. `date` must already be a company-local calendar date.
pub async fn is_holiday(
    pool: &MySqlPool,
    company_id: u64,
    date: chrono::NaiveDate,
) -> Result<bool, sqlx::Error> {
    let key = cache_key(company_id, &calendar::date_key(date));
    if let Some(hit) = HOLIDAY_CACHE.get(&key).await {
        return Ok(hit);
    }

    let holidays = sqlx::query_as::<_, Holiday>(
        "SELECT * FROM holidays WHERE company_id = ?",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    let answer = calendar::is_holiday(date, &holidays);
    HOLIDAY_CACHE.insert(key, answer).await;
    Ok(answer)
}

/// Drop every cached answer for one company. Called from the holiday
/// admin-write path; a stale positive would suppress miss detection for a
/// whole day.
pub fn invalidate_company(company_id: u64) {
    let prefix = format!("{company_id}:");
    if let Err(e) = HOLIDAY_CACHE.invalidate_entries_if(move |k, _| k.starts_with(&prefix)) {
        log::warn!("Holiday cache invalidation failed for company {company_id}: {e:?}");
    }
}

/// Pre-load today's holiday answers for every active company so the first
/// scheduled run after startup does not fan out to the store.
pub async fn warmup_holiday_cache(pool: &MySqlPool) -> Result<()> {
    let companies = sqlx::query_as::<_, (u64, String)>(
        "SELECT id, timezone FROM companies WHERE is_active = 1",
    )
    .fetch_all(pool)
    .await?;

    let mut total_count = 0usize;
    for (company_id, timezone) in companies {
        let tz = calendar::parse_tz(&timezone);
        let today = calendar::local_today(&tz);
        is_holiday(pool, company_id, today).await?;
        total_count += 1;
    }

    log::info!("Holiday cache warmup complete: {total_count} companies");

    Ok(())
}
