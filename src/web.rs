mod poll_api;
mod socket;

use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;
use uuid::Uuid;
use warp::Filter;

use crate::broadcast::Broadcaster;
use crate::pipeline::PollService;
use crate::store::MemoryStore;

pub async fn setup() {
    dotenv().ok();
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(5000);

    let service = Arc::new(PollService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(Broadcaster::new()),
    ));

    let routes = routes(service);

    info!(port, "poll server listening");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}

pub fn routes(
    service: Arc<PollService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let list_polls = warp::get()
        .and(warp::path!("api" / "polls"))
        .and(with_service(service.clone()))
        .and_then(poll_api::list_polls);

    let create_poll = warp::post()
        .and(warp::path!("api" / "polls"))
        .and(warp::body::json())
        .and(with_service(service.clone()))
        .and_then(poll_api::create_poll);

    let cast_vote = warp::post()
        .and(warp::path!("api" / "polls" / Uuid / "vote"))
        .and(warp::addr::remote())
        .and(warp::body::json())
        .and(with_service(service.clone()))
        .and_then(poll_api::cast_vote);

    let like_poll = warp::post()
        .and(warp::path!("api" / "polls" / Uuid / "like"))
        .and(with_service(service.clone()))
        .and_then(poll_api::like_poll);

    let events = warp::path!("api" / "events")
        .and(warp::ws())
        .and(with_service(service))
        .map(|ws: warp::ws::Ws, service: Arc<PollService>| {
            ws.on_upgrade(move |socket| socket::viewer_connected(socket, service))
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    list_polls
        .or(create_poll)
        .or(cast_vote)
        .or(like_poll)
        .or(events)
        .with(cors)
}

fn with_service(
    service: Arc<PollService>,
) -> impl Filter<Extract = (Arc<PollService>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || service.clone())
}
