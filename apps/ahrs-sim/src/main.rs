//! AHRS 链路仿真器
//!
//! 在仿真协处理器上运行链路管理器：喂入合成的 GPS / 气压数据，
//! 每秒打印一次链路状态，退出时输出最终的 `AhrsStatus`。

use ahrs_comms::{LinkConfig, LinkEvent, LinkManagerBuilder, LinkTask, codec, events};
use ahrs_store::{
    AhrsAlgorithm, AhrsSettings, AhrsStatus, BaroAltitude, GpsPosition, HomeLocation,
    ObjectStore,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use opahrs_link::{SimConfig, SimTransport};
use opahrs_protocol::{GPS_DEGREE_SCALE, Lla};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FEED_INTERVAL: Duration = Duration::from_millis(200);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// 仿真起点（苏黎世）
const HOME: Lla = Lla {
    lat_deg: 47.3977,
    lon_deg: 8.5456,
    alt_m: 488.0,
};

/// 起点处的地磁场（nT，NED）
const HOME_BE: [f32; 3] = [21_000.0, 1_200.0, 43_000.0];

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    InsGps,
    Simple,
}

impl From<Algorithm> for AhrsAlgorithm {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::InsGps => AhrsAlgorithm::InsGps,
            Algorithm::Simple => AhrsAlgorithm::Simple,
        }
    }
}

/// AHRS 链路仿真器
#[derive(Parser, Debug)]
#[command(name = "ahrs-sim")]
#[command(about = "Run the AHRS link manager against a simulated coprocessor", long_about = None)]
#[command(version)]
struct Args {
    /// 链路配置文件（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 稳态周期（毫秒）
    #[arg(long, default_value_t = 20)]
    period_ms: u32,

    /// 交换原始传感器数据
    #[arg(long)]
    raw: bool,

    /// 关闭融合数据交换
    #[arg(long)]
    no_filtered: bool,

    /// 设备算法
    #[arg(long, value_enum, default_value_t = Algorithm::InsGps)]
    algorithm: Algorithm,

    /// 室内模式（GPS 只发占位值）
    #[arg(long)]
    indoor: bool,

    /// 每个请求的随机故障概率
    #[arg(long, default_value_t = 0.0)]
    failure_rate: f64,

    /// 随机种子
    #[arg(long)]
    seed: Option<u64>,

    /// 运行时长（秒），不指定则运行到 Ctrl+C
    #[arg(long)]
    duration_secs: Option<u64>,

    /// 以 JSON 输出最终状态
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_thread_names(true)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LinkConfig::from_file(path)
            .with_context(|| format!("failed to load link config from {}", path.display()))?,
        None => LinkConfig::default(),
    };

    if !(0.0..=1.0).contains(&args.failure_rate) {
        anyhow::bail!("--failure-rate must be within [0, 1], got {}", args.failure_rate);
    }

    let store = Arc::new(ObjectStore::new());
    store.set(AhrsSettings {
        algorithm: args.algorithm.into(),
        update_period_ms: args.period_ms,
        update_raw: args.raw,
        update_filtered: !args.no_filtered,
    });
    store.set(HomeLocation {
        indoor: args.indoor,
        ..codec::home_location_at(HOME, HOME_BE)
    });

    let sim = SimTransport::new(SimConfig {
        failure_rate: args.failure_rate,
        seed: args.seed,
        ..Default::default()
    });

    let (event_tx, event_rx) = events::channel(config.event_capacity);
    let task = LinkManagerBuilder::new(sim)
        .store(store.clone())
        .config(config)
        .event_sender(event_tx)
        .spawn()
        .context("failed to start AHRS link thread")?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set signal handler")?;

    info!(
        "ahrs-sim started: period {} ms, raw {}, filtered {}, failure rate {}",
        args.period_ms, args.raw, !args.no_filtered, args.failure_rate
    );

    let deadline = args.duration_secs.map(|s| Instant::now() + Duration::from_secs(s));
    let started = Instant::now();
    let mut last_report = Instant::now();

    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        let t = started.elapsed().as_secs_f64();
        store.set(synthetic_fix(t));
        store.set(BaroAltitude {
            altitude: 10.0 + (t * 0.2).sin() as f32,
        });

        for event in event_rx.try_iter() {
            log_event(&event);
        }

        if last_report.elapsed() >= REPORT_INTERVAL {
            report(&task);
            last_report = Instant::now();
        }

        std::thread::sleep(FEED_INTERVAL);
    }

    let metrics = task.metrics();
    task.stop();

    let status = store.get::<AhrsStatus>();
    if args.json {
        let out = serde_json::json!({
            "status": status,
            "metrics": metrics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{:#?}", status);
        println!("{:#?}", metrics);
    }

    Ok(())
}

/// 绕起点做半径约 50m 的圆周运动；每 20 秒有 3 秒卫星不足
fn synthetic_fix(t: f64) -> GpsPosition {
    let angle = t * 0.1;
    let dlat = 50.0 / 111_320.0 * angle.cos();
    let dlon = 50.0 / (111_320.0 * HOME.lat_deg.to_radians().cos()) * angle.sin();
    let degraded = t % 20.0 > 17.0;

    GpsPosition {
        latitude: ((HOME.lat_deg + dlat) * GPS_DEGREE_SCALE).round() as i32,
        longitude: ((HOME.lon_deg + dlon) * GPS_DEGREE_SCALE).round() as i32,
        altitude: HOME.alt_m as f32,
        geoid_separation: 0.0,
        groundspeed: 5.0,
        heading: ((angle.to_degrees() + 90.0) % 360.0) as f32,
        satellites: if degraded { 4 } else { 9 },
        pdop: if degraded { 6.0 } else { 1.4 },
    }
}

fn log_event(event: &LinkEvent) {
    match event {
        LinkEvent::StateChanged { from, to } => info!("link {} -> {}", from, to),
        LinkEvent::Identified { serial } => {
            let serial: String = serial.iter().map(|b| format!("{:02x}", b)).collect();
            info!("device identified, serial {}", serial)
        },
        LinkEvent::StepFailed { step, error } => warn!("{} failed: {}", step, error),
    }
}

fn report(task: &LinkTask) {
    let status = task.store().get::<AhrsStatus>();
    let metrics = task.metrics();
    info!(
        "state {} | periods {} | sessions {} | overruns {:.1}% | errors {:?} | cpu {}%",
        task.state(),
        metrics.periods_completed,
        metrics.sessions_established,
        metrics.overrun_rate(),
        status.comm_errors,
        status.cpu_load,
    );
}
