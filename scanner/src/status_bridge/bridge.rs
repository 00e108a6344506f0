use crate::classifier::EnergyClassifier;
use crate::generator::trace::{build_trace, TraceConfig};
use crate::status_bridge::model::StatusModel;
use crate::workflow::runner::Runner;
use anyhow::Result;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

fn status_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9100))
}

#[derive(Debug)]
struct BridgeError;

impl warp::reject::Reject for BridgeError {}

/// Hosts the HTTP status surface consumed by the (out-of-core) UI:
/// `GET /status` returns the current model, `POST /scan` replays a
/// generated trace through the offline runner.
pub struct StatusBridge {
    state: Arc<RwLock<StatusModel>>,
}

impl StatusBridge {
    pub fn new(runner: Arc<Runner>, sigma_threshold: f32) -> Self {
        let state = Arc::new(RwLock::new(StatusModel::default()));
        let state_for_filter = state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());
        let runner_filter = warp::any().map(move || runner.clone());

        let get_route = warp::path("status")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: Arc<RwLock<StatusModel>>| warp::reply::json(&*state.read().unwrap()));

        let scan_route = warp::path("scan")
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter)
            .and(runner_filter)
            .and_then(
                move |config: TraceConfig,
                      state: Arc<RwLock<StatusModel>>,
                      runner: Arc<Runner>| async move {
                    let trace = build_trace(&config);
                    match runner.execute(&trace, Box::new(EnergyClassifier::new(sigma_threshold)))
                    {
                        Ok(summary) => {
                            {
                                let mut guard = state.write().unwrap();
                                guard.label = summary.final_label.clone();
                                guard.confidence = summary.last_confidence;
                                guard.sigma = summary.peak_sigma;
                                guard.active = summary.final_label == "Device";
                                guard.cycles = summary.cycles;
                            }
                            Ok::<_, warp::Rejection>(warp::reply::with_status(
                                warp::reply::json(&json!({
                                    "status": "ok",
                                    "cycles": summary.cycles,
                                    "activations": summary.activations,
                                })),
                                StatusCode::OK,
                            ))
                        }
                        Err(err) => {
                            eprintln!("scan error: {}", err);
                            Err(warp::reject::custom(BridgeError))
                        }
                    }
                },
            );

        thread::spawn(move || {
            let routes = get_route.or(scan_route);
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build runtime");
            runtime.block_on(async move {
                warp::serve(routes).run(status_bind_address()).await;
            });
        });

        Self { state }
    }

    pub fn publish(&self, model: &StatusModel) -> Result<()> {
        let mut guard = self.state.write().unwrap();
        *guard = model.clone();
        Ok(())
    }

    /// Applies a partial update without clobbering the rest of the
    /// model; the live event pump calls this per session event.
    pub fn update<F: FnOnce(&mut StatusModel)>(&self, apply: F) {
        let mut guard = self.state.write().unwrap();
        apply(&mut guard);
    }

    pub fn publish_status(&self, message: &str) {
        self.update(|model| model.status = message.to_string());
        println!("[status] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> StatusModel {
        self.state.read().unwrap().clone()
    }
}
