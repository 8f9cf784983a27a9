//! Field-probe simulator — drives a full session against a running daemon
//!
//! Publishes a start signal, a burst of jittered telemetry samples, and a
//! stop signal through the daemon's HTTP channel adapter, then polls the
//! session snapshot and prints the averaged reading and the recommended
//! crop. Useful for demos and for exercising a deployment end to end
//! without sensor hardware.
//!
//! ```bash
//! cargo run --bin soilsense-probe -- --url http://127.0.0.1:5750 --samples 10
//! ```

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::Rng;
use soilsense_common::{SoilReading, TopicMap};

/// Command-line arguments for soilsense-probe
#[derive(Parser, Debug)]
#[command(name = "soilsense-probe")]
#[command(about = "Simulated soil probe driving a session over HTTP")]
#[command(version)]
struct Args {
    /// Base URL of the session daemon
    #[arg(long, env = "SOILSENSE_URL", default_value = "http://127.0.0.1:5750")]
    url: String,

    /// Number of telemetry samples to publish
    #[arg(short = 'n', long, default_value_t = 8)]
    samples: usize,

    /// Delay between samples, in milliseconds
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,

    /// Baseline pH around which samples jitter
    #[arg(long, default_value_t = 6.2)]
    ph: f64,

    /// Baseline nitrogen (mg/kg)
    #[arg(long, default_value_t = 42.0)]
    nitrogen: f64,

    /// Baseline phosphorus (mg/kg)
    #[arg(long, default_value_t = 38.0)]
    phosphorus: f64,

    /// Baseline potassium (mg/kg)
    #[arg(long, default_value_t = 45.0)]
    potassium: f64,

    /// Jitter amplitude as a fraction of each baseline (0.05 = ±5%)
    #[arg(long, default_value_t = 0.05)]
    jitter: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let topics = TopicMap::default();
    let client = reqwest::Client::new();

    println!("=== SoilSense field-probe simulator ===");
    println!("Daemon:  {}", args.url);
    println!(
        "Profile: pH {:.2}, N {:.1}, P {:.1}, K {:.1} (±{:.0}%)",
        args.ph,
        args.nitrogen,
        args.phosphorus,
        args.potassium,
        args.jitter * 100.0
    );

    publish(&client, &args.url, &topics.control, "1".to_string())
        .await
        .context("Failed to publish the start signal")?;
    println!("\nSession started");

    let mut rng = rand::thread_rng();
    for i in 1..=args.samples {
        let reading = SoilReading::new(
            jittered(&mut rng, args.ph, args.jitter),
            jittered(&mut rng, args.nitrogen, args.jitter),
            jittered(&mut rng, args.phosphorus, args.jitter),
            jittered(&mut rng, args.potassium, args.jitter),
        );
        let payload = serde_json::to_string(&reading)?;
        publish(&client, &args.url, &topics.telemetry, payload)
            .await
            .with_context(|| format!("Failed to publish sample {} of {}", i, args.samples))?;
        println!(
            "  sample {:>3}: pH {:.2}  N {:.1}  P {:.1}  K {:.1}",
            i, reading.ph, reading.nitrogen, reading.phosphorus, reading.potassium
        );
        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }

    publish(&client, &args.url, &topics.control, "0".to_string())
        .await
        .context("Failed to publish the stop signal")?;
    println!("Session stopped; waiting for the outcome");

    let outcome = poll_outcome(&client, &args.url)
        .await
        .context("Failed to fetch the session outcome")?;

    let average = &outcome["average"];
    println!("\nAveraged over {} samples:", outcome["sample_count"]);
    println!("  pH: {}", average["PH"]);
    println!("  N:  {}", average["N"]);
    println!("  P:  {}", average["P"]);
    println!("  K:  {}", average["K"]);
    println!(
        "Recommended crop: {}",
        outcome["label"].as_str().unwrap_or("(none)")
    );

    Ok(())
}

fn jittered(rng: &mut impl Rng, baseline: f64, jitter: f64) -> f64 {
    let amplitude = baseline.abs() * jitter;
    baseline + rng.gen_range(-amplitude..=amplitude)
}

/// Publish one payload onto a channel topic through the HTTP adapter
async fn publish(
    client: &reqwest::Client,
    base_url: &str,
    topic: &str,
    payload: String,
) -> Result<()> {
    let url = format!("{}/publish/{}", base_url.trim_end_matches('/'), topic);
    let response = client.post(&url).body(payload).send().await?;
    if !response.status().is_success() {
        bail!("{} returned {}", url, response.status());
    }
    Ok(())
}

/// Poll the session snapshot until the last outcome appears
///
/// The daemon executes aggregation between two inbound messages, so the
/// outcome is normally visible on the first poll; a short retry window
/// covers scheduling delay.
async fn poll_outcome(client: &reqwest::Client, base_url: &str) -> Result<serde_json::Value> {
    let url = format!("{}/session", base_url.trim_end_matches('/'));
    for _ in 0..20 {
        let status: serde_json::Value = client.get(&url).send().await?.json().await?;
        let outcome = &status["last_outcome"];
        if !outcome.is_null() {
            return Ok(outcome.clone());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    bail!("no session outcome after stopping; was any sample accepted?")
}
