use std::env;
use std::sync::Arc;

use hourglass_rs::{SafeTimeProvider, TimeSource};
use log::*;
use warp::filters::log::Info;
use warp::Filter;

use loan_servicing_rs::api::{routes, Context};
use loan_servicing_rs::{AdminOnly, LoanService, MemoryStore};

#[tokio::main]
async fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(LoanService::new(store, Arc::new(AdminOnly)));
    let time = Arc::new(SafeTimeProvider::new(TimeSource::System));

    let log = warp::log::custom(|info: Info| {
        info!(
            target: "loan::api",
            "\"{} {} {:?}\" \t{} {} {:?}",
            info.method(),
            info.path(),
            info.version(),
            info.status().canonical_reason().unwrap_or("-"),
            info.status().as_u16(),
            info.elapsed(),
        );
    });

    let api = routes(Context { service, time }).with(log);

    info!("listening on port {}", port);
    warp::serve(api).run(([0, 0, 0, 0], port)).await;
}
