use actix::Actor;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{App, HttpServer};
use ashcan::db::init_db;
use ashcan::notifications::server::EventServer;
use env_logger::Env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    init_our_mods();
    init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.")).await;

    // Start the fan-out actor for real-time board events
    let event_server = EventServer::new().start();
    ashcan::notifications::init_event_server(event_server);

    // Spawn periodic maintenance: reaper, capacity backstop, blob
    // reconciler, audit-log retention
    if ashcan::app_config::janitor().enabled {
        ashcan::janitor::spawn_scheduler();
    } else {
        log::warn!("janitor disabled by configuration; run maintenance externally");
    }

    HttpServer::new(move || {
        App::new()
            // Security headers - applied to all responses
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(ashcan::web::configure)
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // This should be calls to crates without any transformative work applied.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Initialize all local mods.
/// Panics
pub fn init_our_mods() {
    // This should be a list of simple function calls.
    // Each module should work mostly independent of others.
    // This way, we can unit test individual modules without loading the entire application.
    ashcan::app_config::init();
    ashcan::storage::init_from_config();
}
