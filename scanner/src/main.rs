use anyhow::Context;
use clap::Parser;
use classifier::EnergyClassifier;
use generator::trace::{build_trace, TraceConfig, TraceSampler};
use magcore::session::{DetectionSession, SessionEvent};
use rand::Rng;
use status_bridge::bridge::StatusBridge;
use status_bridge::model::StatusModel;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ScanConfig;
use workflow::runner::Runner;

mod classifier;
mod generator;
mod status_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Magnetic-signature scanning driver")]
struct Args {
    /// Replay a synthetic trace offline and emit a baseline summary
    /// (the default when no mode is requested)
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a scan config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Peer alert UDP port
    #[arg(long, default_value_t = 8888)]
    port: u16,
    /// Sigma pivot for the stand-in classifier
    #[arg(long, default_value_t = 1.0)]
    sigma_threshold: f32,
    /// Seed for synthetic trace generation
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Inject a device signature into the generated trace
    #[arg(long, default_value_t = false)]
    anomaly: bool,
    /// Run a live session fed by the synthetic sensor (Ctrl+C to stop)
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scan_config = if let Some(path) = &args.workflow {
        ScanConfig::load(path)?
    } else {
        ScanConfig::from_args(args.port, args.sigma_threshold)
    };

    let runner = Runner::new(scan_config.clone());
    let bridge = StatusBridge::new(Arc::new(runner.clone()), scan_config.sigma_threshold);

    if run_offline(args.offline, args.serve) {
        let trace_config = if args.anomaly {
            TraceConfig::with_anomaly(args.seed)
        } else {
            TraceConfig::neutral(args.seed)
        };
        let trace = build_trace(&trace_config);
        let summary = runner
            .execute(
                &trace,
                Box::new(EnergyClassifier::new(scan_config.sigma_threshold)),
            )
            .context("executing offline scan")?;

        println!(
            "Offline scan -> cycles {}, activations {}, peak sigma {:.3}, final {}",
            summary.cycles, summary.activations, summary.peak_sigma, summary.final_label
        );

        bridge.publish(&StatusModel {
            status: "Offline scan results ready.".into(),
            label: summary.final_label.clone(),
            confidence: summary.last_confidence,
            sigma: summary.peak_sigma,
            active: summary.final_label == "Device",
            cycles: summary.cycles,
            ..StatusModel::default()
        })?;

        let report = format!(
            "cycles={} activations={} deactivations={} buffering={} peak_sigma={:.4} final={}\n",
            summary.cycles,
            summary.activations,
            summary.deactivations,
            summary.buffering_cycles,
            summary.peak_sigma,
            summary.final_label
        );
        let report_path = PathBuf::from("tools/data/offline_scan.log");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(report_path)?;
        file.write_all(report.as_bytes())?;
    }

    if args.serve {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating live session runtime")?;
        runtime.block_on(serve(scan_config, args.seed, args.anomaly, bridge))?;
    }

    Ok(())
}

/// Live mode: a synthetic sensor producer feeds the detection session
/// in real time while the event pump mirrors session events into the
/// status bridge.
async fn serve(
    scan_config: ScanConfig,
    seed: u64,
    anomaly: bool,
    bridge: StatusBridge,
) -> anyhow::Result<()> {
    let classifier = EnergyClassifier::new(scan_config.sigma_threshold);
    let (session, mut events) = DetectionSession::connect(
        scan_config.to_detector_config(),
        session_uuid(),
        Box::new(classifier),
    )
    .await
    .context("binding peer alert socket")?;

    // Synthetic sensor producer, free-running until shutdown.
    let trace_config = if anomaly {
        TraceConfig {
            anomaly: Some(crate::generator::trace::AnomalyConfig {
                start_ms: 5_000,
                end_ms: u64::MAX / 1_000_000,
                amplitude: 5.0,
                frequency_hz: 30.0,
            }),
            ..TraceConfig::neutral(seed)
        }
    } else {
        TraceConfig::neutral(seed)
    };
    let feed_session = Arc::clone(&session);
    let feed = tokio::spawn(async move {
        let mut sampler = TraceSampler::new(trace_config);
        let started = Instant::now();
        loop {
            let t_ns = started.elapsed().as_nanos() as i64;
            feed_session.ingest(sampler.sample(t_ns));
            let spacing = sampler.next_spacing_ns().max(1) as u64;
            tokio::time::sleep(Duration::from_nanos(spacing)).await;
        }
    });

    // Event pump: session events drive the status bridge.
    let pump = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Status(message) => bridge.publish_status(&message),
                SessionEvent::Prediction {
                    label,
                    confidence,
                    sigma,
                } => bridge.update(|model| {
                    model.label = label.to_string();
                    model.confidence = confidence;
                    model.sigma = sigma;
                    model.active = label == magcore::inference::DetectionLabel::Device;
                    model.cycles += 1;
                }),
                SessionEvent::PeerAlert { sender_short } => {
                    println!("[status] peer alert from {}", sender_short);
                    bridge.update(|model| model.alerts_received += 1);
                }
                SessionEvent::LocalFeedback => {
                    // Vibration/sound live in the excluded UI layer; a
                    // console cue stands in for them here.
                    println!("[status] * local feedback tick *");
                }
                SessionEvent::Magnitude(_) => {}
            }
        }
    });

    session.start();
    println!("Live session running (Ctrl+C to stop)...");
    signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;

    session.stop();
    feed.abort();
    pump.abort();
    Ok(())
}

/// Offline is the default mode so that a bare invocation does useful
/// work instead of exiting silently.
fn run_offline(offline: bool, serve: bool) -> bool {
    offline || !serve
}

/// Random session identifier, generated once per process lifetime and
/// used purely for self-alert suppression on the peer channel.
fn session_uuid() -> String {
    let raw: u128 = rand::thread_rng().gen();
    let hex = format!("{:032x}", raw);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
