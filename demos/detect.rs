//! Device detection walkthrough.
//!
//! With a data file path as the first argument, opens it in the mode named
//! by an optional second argument (`resident` or `streamed`) and detects
//! the remaining arguments, or a few well-known User-Agents when none are
//! given. Without arguments, builds a small in-memory dataset first.
//!
//! ```text
//! RUST_LOG=device_detection=debug cargo run --example detect -- devices.dat streamed
//! ```

use anyhow::Context;
use device_detection::format::DatasetBuilder;
use device_detection::overrides::apply_overrides;
use device_detection::{
    Dataset, DetectionConfig, LoadMode, PatternProvider, PropertyValueType, TrieProvider,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SAMPLE_INPUTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Version/6.0 Mobile/10A5376e Safari/8536.25",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Version/6.0 Mobile/10A5376e Safari/8536.25",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Mobile/10A5376e Safari/8536.25",
    "curl/7.68.0",
];

const SHOWN_PROPERTIES: &[&str] = &["IsMobile", "HardwareModel", "ScreenPixelsWidth", "PlatformVersion"];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let dataset = match args.first() {
        Some(path) => {
            let mode = match args.get(1).map(String::as_str) {
                Some("streamed") => LoadMode::Streamed,
                _ => LoadMode::Resident,
            };
            let config = DetectionConfig::new().with_load_mode(mode);
            Dataset::open(path, &config).with_context(|| format!("opening {path}"))?
        }
        None => Dataset::from_bytes(sample_dataset()?).context("loading sample dataset")?,
    };
    let dataset = Arc::new(dataset);

    println!(
        "Dataset '{}' ({} tier, {:?}): {} properties, {} signatures",
        dataset.name(),
        dataset.tier(),
        dataset.mode(),
        dataset.property_count(),
        dataset.signature_count()
    );

    let inputs: Vec<&str> = if args.len() > 2 {
        args[2..].iter().map(String::as_str).collect()
    } else {
        SAMPLE_INPUTS.to_vec()
    };

    let provider = PatternProvider::new(Arc::clone(&dataset))?;
    for input in &inputs {
        let result = provider.detect(input)?;
        println!("\n{input}");
        println!(
            "  method={} difference={} device={}",
            result.method(),
            result.difference(),
            result.device_id()
        );
        for name in SHOWN_PROPERTIES {
            if let Some(values) = result.values(name)? {
                let marker = if values.is_default() { " (default)" } else { "" };
                println!("  {name}: {values}{marker}");
            }
        }
    }

    if let Some(first) = inputs.first() {
        let mut result = provider.detect(first)?;
        let applied = apply_overrides(&mut result, "17471")?;
        println!("\nApplied {applied} override(s): {}", serde_json::to_string(&result.summary())?);
    }

    if let Ok(trie) = TrieProvider::new(Arc::clone(&dataset)) {
        println!("\nTrie:");
        for input in &inputs {
            let device = trie.device_index(input)?;
            let model = trie.property_value(device, "HardwareModel")?;
            println!("  device={device} model={}", model.as_deref().unwrap_or("-"));
        }
    }

    println!("\nStats: {}", serde_json::to_string(&provider.stats())?);
    Ok(())
}

/// A tiny iPhone-only dataset.
fn sample_dataset() -> anyhow::Result<Vec<u8>> {
    let mut b = DatasetBuilder::new("Sample", "Lite");
    let hardware = b.add_component("HardwarePlatform", 1);
    let platform = b.add_component("SoftwarePlatform", 2);

    let is_mobile = b.add_property(hardware, "IsMobile", PropertyValueType::Bool, None);
    let model = b.add_property(hardware, "HardwareModel", PropertyValueType::String, None);
    let width = b.add_property(hardware, "ScreenPixelsWidth", PropertyValueType::Int, None);
    let version = b.add_property(platform, "PlatformVersion", PropertyValueType::String, None);

    let mobile = b.add_value(is_mobile, "True");
    let desktop = b.add_value(is_mobile, "False");
    b.set_default_value(is_mobile, desktop);
    let iphone = b.add_value(model, "iPhone");
    let unknown = b.add_value(model, "Unknown");
    b.set_default_value(model, unknown);
    let narrow = b.add_value(width, "640");
    let ios6 = b.add_value(version, "6.0");
    let ios7 = b.add_value(version, "7.1");

    let unknown_hardware = b.add_profile(hardware, 1001, &[unknown]);
    b.set_default_profile(hardware, unknown_hardware);
    let iphone_hardware = b.add_profile(hardware, 17779, &[mobile, iphone, narrow]);
    let ios6_platform = b.add_profile(platform, 17470, &[ios6]);
    b.set_default_profile(platform, ios6_platform);
    b.add_profile(platform, 17471, &[ios7]);

    for fragment in [
        "iPhone;",
        "CPU iPhone OS 6_0",
        "AppleWebKit/536.26",
        "Version/6.0",
        "Safari/8536.25",
    ] {
        b.add_node(fragment, None);
    }
    b.add_signature_from_sample(SAMPLE_INPUTS[0], &[iphone_hardware, ios6_platform], 1);
    b.add_trie_entry("Mozilla/5.0 (iPhone", &[iphone_hardware, ios6_platform]);

    Ok(b.build()?)
}
