use crate::{
    api::{check_in, company, holiday, jobs, team, worker},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let api_limiter = Arc::new(build_limiter(config.rate_api_per_min));
    // Batch jobs are heavier; keep the trigger endpoints on a tight budget.
    let jobs_limiter = Arc::new(build_limiter(config.rate_jobs_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(api_limiter)
            .service(
                web::scope("/companies").service(
                    web::resource("")
                        .route(web::post().to(company::create_company))
                        .route(web::get().to(company::list_companies)),
                ),
            )
            .service(
                web::scope("/workers")
                    // /workers
                    .service(
                        web::resource("")
                            .route(web::post().to(worker::create_worker))
                            .route(web::get().to(worker::list_workers)),
                    )
                    // /workers/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(worker::update_worker))
                            .route(web::get().to(worker::get_worker)),
                    )
                    // /workers/{id}/team — transfer engine entry point
                    .service(
                        web::resource("/{id}/team").route(web::post().to(worker::assign_team)),
                    )
                    // /workers/{id}/transfer
                    .service(
                        web::resource("/{id}/transfer")
                            .route(web::delete().to(worker::cancel_transfer)),
                    ),
            )
            .service(
                web::scope("/teams")
                    .service(
                        web::resource("")
                            .route(web::post().to(team::create_team))
                            .route(web::get().to(team::list_teams)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(team::update_team))
                            .route(web::get().to(team::get_team)),
                    ),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::post().to(holiday::create_holiday))
                            .route(web::get().to(holiday::list_holidays)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(holiday::update_holiday))
                            .route(web::delete().to(holiday::delete_holiday)),
                    ),
            )
            .service(
                web::scope("/check-ins").service(
                    web::resource("")
                        .route(web::post().to(check_in::submit_check_in))
                        .route(web::get().to(check_in::list_check_ins)),
                ),
            )
            .service(
                web::scope("/missed")
                    .service(web::resource("").route(web::get().to(check_in::list_missed))),
            )
            .service(
                web::scope("/jobs")
                    .wrap(jobs_limiter)
                    .service(
                        web::resource("/miss-detection")
                            .route(web::post().to(jobs::run_miss_detection)),
                    )
                    .service(
                        web::resource("/transfers").route(web::post().to(jobs::run_due_transfers)),
                    ),
            ),
    );
}
