use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_jobs_per_min: u32,
    pub rate_api_per_min: u32,

    pub api_prefix: String,

    // In-process scheduler intervals (seconds)
    pub transfer_job_interval: u64,
    pub miss_job_interval: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            rate_jobs_per_min: env::var("RATE_JOBS_PER_MIN")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap(),
            rate_api_per_min: env::var("RATE_API_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            transfer_job_interval: env::var("TRANSFER_JOB_INTERVAL")
                .unwrap_or_else(|_| "900".to_string()) // every 15 min
                .parse()
                .unwrap(),
            miss_job_interval: env::var("MISS_JOB_INTERVAL")
                .unwrap_or_else(|_| "3600".to_string()) // hourly sweep
                .parse()
                .unwrap(),
        }
    }
}
