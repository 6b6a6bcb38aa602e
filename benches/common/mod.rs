//! Common utilities for device detection benchmarks.
//!
//! Builds a synthetic dataset of configurable size and a matching input mix,
//! so each benchmark runs against the same realistic shape of data.

use device_detection::format::DatasetBuilder;
use device_detection::PropertyValueType;

const OS_VERSIONS: usize = 20;
const BROWSER_VERSIONS: usize = 10;
const WIDTHS: usize = 100;

/// Standard benchmark configuration for consistent testing.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of device signatures in the dataset
    pub signature_count: usize,
    /// Number of inputs to detect in batch tests
    pub input_count: usize,
    /// Whether to add a trie section
    pub with_trie: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            signature_count: 1_000,
            input_count: 1_000,
            with_trie: true,
        }
    }
}

impl BenchmarkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of signatures.
    pub fn with_signature_count(mut self, count: usize) -> Self {
        self.signature_count = count;
        self
    }

    /// Set the number of inputs for batch testing.
    pub fn with_input_count(mut self, count: usize) -> Self {
        self.input_count = count;
        self
    }

    /// Configuration for scaling tests.
    pub fn scaling() -> Self {
        Self {
            signature_count: 10_000,
            input_count: 1_000,
            with_trie: false,
        }
    }
}

fn device_input(device: usize, os: usize, os_minor: usize, browser: usize) -> String {
    format!("Mozilla/5.0 (Device{device:05}; OS {os}_{os_minor}) Browser/{browser}.0 Extra")
}

/// Synthetic data file: one hardware profile and signature per device.
pub fn generate_dataset(config: &BenchmarkConfig) -> Vec<u8> {
    let mut b = DatasetBuilder::new("Benchmark Devices", "Premium");
    let hardware = b.add_component("HardwarePlatform", 1);
    let platform = b.add_component("SoftwarePlatform", 2);

    let width = b.add_property(hardware, "ScreenPixelsWidth", PropertyValueType::Int, None);
    let model = b.add_property(hardware, "HardwareModel", PropertyValueType::String, None);
    let version = b.add_property(platform, "PlatformVersion", PropertyValueType::String, None);

    let widths: Vec<_> = (0..WIDTHS)
        .map(|w| b.add_value(width, (320 + w * 8).to_string()))
        .collect();
    let unknown_model = b.add_value(model, "Unknown");
    b.set_default_value(model, unknown_model);

    let unknown_hardware = b.add_profile(hardware, 1, &[unknown_model]);
    b.set_default_profile(hardware, unknown_hardware);
    let platforms: Vec<_> = (0..OS_VERSIONS)
        .map(|os| {
            let value = b.add_value(version, format!("{os}.0"));
            b.add_profile(platform, 100 + os as u32, &[value])
        })
        .collect();
    b.set_default_profile(platform, platforms[0]);

    let mozilla = b.add_node("Mozilla/5.0 (", Some(0));
    let devices: Vec<_> = (0..config.signature_count)
        .map(|i| b.add_node(format!("Device{i:05};"), None))
        .collect();
    let os_nodes: Vec<_> = (0..OS_VERSIONS)
        .map(|os| b.add_node(format!("OS {os}_0"), None))
        .collect();
    let browser_nodes: Vec<_> = (0..BROWSER_VERSIONS)
        .map(|v| b.add_node(format!("Browser/{v}.0"), None))
        .collect();

    for (i, &device) in devices.iter().enumerate() {
        let name = b.add_value(model, format!("Model {i:05}"));
        let profile = b.add_profile(hardware, 10_000 + i as u32, &[widths[i % WIDTHS], name]);
        let os = i % OS_VERSIONS;
        b.add_signature(
            &[mozilla, device, os_nodes[os], browser_nodes[i % BROWSER_VERSIONS]],
            &[profile, platforms[os]],
            i as u32 + 1,
        );
        if config.with_trie {
            b.add_trie_entry(format!("Mozilla/5.0 (Device{i:05}"), &[profile, platforms[os]]);
        }
    }

    // Generator output is always consistent.
    b.build().expect("benchmark dataset builds")
}

/// Inputs mixing exact matches, version drift, missing tokens and noise.
pub fn generate_inputs(config: &BenchmarkConfig) -> Vec<String> {
    (0..config.input_count)
        .map(|i| {
            let device = (i * 7919) % config.signature_count;
            let os = device % OS_VERSIONS;
            let browser = device % BROWSER_VERSIONS;
            match i % 8 {
                0..=4 => device_input(device, os, 0, browser),
                5 => device_input(device, os, 3, browser),
                6 => format!("Mozilla/5.0 (Device{device:05}; Unknown)"),
                _ => format!("curl/7.{i}.0"),
            }
        })
        .collect()
}

/// Inputs that all decompose into an existing signature.
pub fn generate_exact_inputs(config: &BenchmarkConfig) -> Vec<String> {
    (0..config.input_count)
        .map(|i| {
            let device = (i * 7919) % config.signature_count;
            device_input(device, device % OS_VERSIONS, 0, device % BROWSER_VERSIONS)
        })
        .collect()
}
