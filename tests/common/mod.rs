//! Shared fixtures for integration tests.
//!
//! The datasets are assembled with `DatasetBuilder`, so every test runs
//! against real file images in the same binary format a production data
//! file uses.

#![allow(dead_code)]

use device_detection::entities::PropertyValueType;
use device_detection::format::{BuilderId, DatasetBuilder};
use device_detection::{CacheConfig, Dataset, DetectionConfig, LoadMode, PatternProvider};
use std::io::Write;
use std::sync::Arc;

pub const IPHONE_GOOGLEBOT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Version/6.0 Mobile/10A5376e Safari/8536.25 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

pub const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Version/6.0 Mobile/10A5376e Safari/8536.25";

/// Same as [`IPHONE`] with a newer OS version: only numbers differ.
pub const IPHONE_NEWER_OS: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Version/6.0 Mobile/10A5376e Safari/8536.25";

/// [`IPHONE`] without its `Version/6.0` token: one node from a signature.
pub const IPHONE_NO_VERSION: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Mobile/10A5376e Safari/8536.25";

/// Crawler token without Safari: one node away from two signatures.
pub const IPHONE_BOT_NO_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Version/6.0 Mobile/10A5376e (compatible; Googlebot/2.1)";

pub const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 6_0 like Mac OS X) AppleWebKit/536.26 (KHTML, like Gecko) Version/6.0 Mobile/10A5376e Safari/8536.25";

pub const DESKTOP_CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const UNKNOWN: &str = "curl/7.68.0";

/// Every fixture input, for parity and stress tests.
pub const ALL_INPUTS: &[&str] = &[
    IPHONE_GOOGLEBOT,
    IPHONE,
    IPHONE_NEWER_OS,
    IPHONE_NO_VERSION,
    IPHONE_BOT_NO_SAFARI,
    IPAD,
    DESKTOP_CHROME,
    UNKNOWN,
    "",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
];

// Profile ids
pub const UNKNOWN_HARDWARE: u32 = 1001;
pub const DESKTOP_HARDWARE: u32 = 17000;
pub const IPHONE_HARDWARE: u32 = 17779;
pub const IPAD_HARDWARE: u32 = 17781;
pub const UNKNOWN_PLATFORM: u32 = 2001;
pub const WINDOWS_PLATFORM: u32 = 17200;
pub const IOS6_PLATFORM: u32 = 17470;
pub const IOS7_PLATFORM: u32 = 17471;
pub const UNKNOWN_BROWSER: u32 = 3001;
pub const CHROME_BROWSER: u32 = 18100;
pub const SAFARI_BROWSER: u32 = 18092;
pub const NOT_CRAWLER: u32 = 4001;
pub const GOOGLEBOT_CRAWLER: u32 = 18900;

/// Properties of the premium-tier fixture.
pub const PREMIUM_PROPERTY_COUNT: usize = 130;

/// Four-component dataset with iPhone, iPad, desktop and crawler
/// signatures plus a trie section.
pub fn device_builder() -> DatasetBuilder {
    let mut b = DatasetBuilder::new("Fixture Devices", "Lite");

    let hardware = b.add_component("HardwarePlatform", 1);
    let platform = b.add_component("SoftwarePlatform", 2);
    let browser = b.add_component("BrowserUA", 3);
    let crawler = b.add_component("Crawler", 4);

    let is_mobile = b.add_property(
        hardware,
        "IsMobile",
        PropertyValueType::Bool,
        Some("Indicates if the device's primary data connection is wireless."),
    );
    let width = b.add_property(
        hardware,
        "ScreenPixelsWidth",
        PropertyValueType::Int,
        Some("The width of the device's screen in pixels."),
    );
    b.set_property_category(width, "Screen");
    let diagonal = b.add_property(
        hardware,
        "ScreenInchesDiagonal",
        PropertyValueType::Double,
        Some("The diagonal size of the device's screen in inches."),
    );
    let model = b.add_property(
        hardware,
        "HardwareModel",
        PropertyValueType::String,
        Some("The model name of the device."),
    );
    let platform_name = b.add_property(platform, "PlatformName", PropertyValueType::String, None);
    let platform_version =
        b.add_property(platform, "PlatformVersion", PropertyValueType::String, None);
    let browser_name = b.add_property(browser, "BrowserName", PropertyValueType::String, None);
    let accept = b.add_property(browser, "CcppAccept", PropertyValueType::StringList, None);
    let javascript = b.add_property(browser, "Javascript", PropertyValueType::Bool, None);
    let is_crawler = b.add_property(crawler, "IsCrawler", PropertyValueType::Bool, None);

    let mobile_true = b.add_value(is_mobile, "True");
    let mobile_false = b.add_value(is_mobile, "False");
    b.set_default_value(is_mobile, mobile_false);
    let width_640 = b.add_value(width, "640");
    let width_768 = b.add_value(width, "768");
    let width_1920 = b.add_value(width, "1920");
    let width_0 = b.add_value(width, "0");
    b.set_default_value(width, width_0);
    let inches_3_5 = b.add_value(diagonal, "3.5");
    let inches_9_7 = b.add_value(diagonal, "9.7");
    let model_iphone = b.add_value(model, "iPhone");
    let model_ipad = b.add_value(model, "iPad");
    let model_desktop = b.add_value(model, "Desktop");
    let model_unknown = b.add_value(model, "Unknown");
    b.set_default_value(model, model_unknown);

    let ios = b.add_value(platform_name, "iOS");
    let windows = b.add_value(platform_name, "Windows");
    let platform_unknown = b.add_value(platform_name, "Unknown");
    b.set_default_value(platform_name, platform_unknown);
    let ios6 = b.add_value(platform_version, "6.0");
    let ios7 = b.add_value(platform_version, "7.1");
    let win10 = b.add_value(platform_version, "10");

    let safari = b.add_value(browser_name, "Mobile Safari");
    let chrome = b.add_value(browser_name, "Chrome");
    let browser_unknown = b.add_value(browser_name, "Unknown");
    b.set_default_value(browser_name, browser_unknown);
    let accept_html = b.add_value(accept, "text/html");
    let accept_png = b.add_value(accept, "image/png");
    let js_true = b.add_value(javascript, "True");
    let js_false = b.add_value(javascript, "False");
    b.set_default_value(javascript, js_false);

    let crawler_true = b.add_value(is_crawler, "True");
    let crawler_false = b.add_value(is_crawler, "False");
    b.set_default_value(is_crawler, crawler_false);

    let unknown_hw = b.add_profile(hardware, UNKNOWN_HARDWARE, &[model_unknown]);
    b.set_default_profile(hardware, unknown_hw);
    let iphone_hw = b.add_profile(
        hardware,
        IPHONE_HARDWARE,
        &[mobile_true, width_640, inches_3_5, model_iphone],
    );
    let ipad_hw = b.add_profile(
        hardware,
        IPAD_HARDWARE,
        &[mobile_true, width_768, inches_9_7, model_ipad],
    );
    let desktop_hw = b.add_profile(
        hardware,
        DESKTOP_HARDWARE,
        &[mobile_false, width_1920, model_desktop],
    );

    let unknown_sw = b.add_profile(platform, UNKNOWN_PLATFORM, &[platform_unknown]);
    b.set_default_profile(platform, unknown_sw);
    let ios6_sw = b.add_profile(platform, IOS6_PLATFORM, &[ios, ios6]);
    let _ios7_sw = b.add_profile(platform, IOS7_PLATFORM, &[ios, ios7]);
    let windows_sw = b.add_profile(platform, WINDOWS_PLATFORM, &[windows, win10]);

    let unknown_br = b.add_profile(browser, UNKNOWN_BROWSER, &[browser_unknown]);
    b.set_default_profile(browser, unknown_br);
    let safari_br = b.add_profile(
        browser,
        SAFARI_BROWSER,
        &[safari, accept_html, accept_png, js_true],
    );
    let chrome_br = b.add_profile(browser, CHROME_BROWSER, &[chrome, accept_html, js_true]);

    let not_crawler = b.add_profile(crawler, NOT_CRAWLER, &[crawler_false]);
    b.set_default_profile(crawler, not_crawler);
    let googlebot = b.add_profile(crawler, GOOGLEBOT_CRAWLER, &[crawler_true]);

    for (fragment, position) in [
        ("Mozilla/5.0 (", Some(0)),
        ("iPhone;", None),
        ("CPU iPhone OS 6_0", None),
        ("like Mac OS X", None),
        ("AppleWebKit/536.26", None),
        ("Version/6.0", None),
        ("Mobile/10A5376e", None),
        ("Safari/8536.25", None),
        ("Googlebot/2.1", None),
        ("iPad;", None),
        ("CPU OS 6_0", None),
        ("Windows NT 10.0", None),
        ("AppleWebKit/537.36", None),
        ("Chrome/120.0", None),
        ("Safari/537.36", None),
    ] {
        b.add_node(fragment, position);
    }

    b.add_signature_from_sample(
        IPHONE_GOOGLEBOT,
        &[iphone_hw, ios6_sw, safari_br, googlebot],
        1,
    );
    b.add_signature_from_sample(IPHONE, &[iphone_hw, ios6_sw, safari_br, not_crawler], 2);
    b.add_signature_from_sample(
        DESKTOP_CHROME,
        &[desktop_hw, windows_sw, chrome_br, not_crawler],
        3,
    );
    b.add_signature_from_sample(IPAD, &[ipad_hw, ios6_sw, safari_br, not_crawler], 5);

    b.add_trie_entry(
        "Mozilla/5.0 (iPhone",
        &[iphone_hw, ios6_sw, safari_br, not_crawler],
    );
    b.add_trie_entry("Mozilla/5.0 (iPad", &[ipad_hw, ios6_sw, safari_br, not_crawler]);
    b.add_trie_entry(
        "Mozilla/5.0 (Windows",
        &[desktop_hw, windows_sw, chrome_br, not_crawler],
    );
    b.add_trie_entry("Googlebot", &[googlebot]);

    b
}

pub fn device_bytes() -> Vec<u8> {
    device_builder().build().expect("fixture builds")
}

pub fn resident_dataset() -> Arc<Dataset> {
    Arc::new(Dataset::from_bytes(device_bytes()).expect("fixture loads"))
}

pub fn resident_provider() -> PatternProvider {
    PatternProvider::new(resident_dataset()).expect("provider builds")
}

/// Write `bytes` to a temporary file that lives as long as the handle.
pub fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write fixture");
    file.flush().expect("flush fixture");
    file
}

/// Streamed dataset over a temporary copy of the device fixture.
pub fn streamed_dataset(cache: CacheConfig) -> (tempfile::NamedTempFile, Arc<Dataset>) {
    let file = write_temp(&device_bytes());
    let config = DetectionConfig::new()
        .with_load_mode(LoadMode::Streamed)
        .with_cache(cache);
    let dataset = Dataset::open(file.path(), &config).expect("streamed fixture loads");
    (file, Arc::new(dataset))
}

/// Premium-tier dataset: four components and exactly
/// [`PREMIUM_PROPERTY_COUNT`] described properties.
pub fn premium_builder() -> DatasetBuilder {
    let mut b = DatasetBuilder::new("Fixture Premium", "Premium");
    let components: Vec<BuilderId> = ["HardwarePlatform", "SoftwarePlatform", "BrowserUA", "Crawler"]
        .iter()
        .enumerate()
        .map(|(i, name)| b.add_component(*name, i as u32 + 1))
        .collect();

    let mut selections: Vec<Vec<BuilderId>> = vec![Vec::new(); components.len()];
    for i in 0..PREMIUM_PROPERTY_COUNT {
        let slot = i % components.len();
        let property = b.add_property(
            components[slot],
            format!("Property{i:03}"),
            PropertyValueType::String,
            Some(format!("Description of property {i}.").as_str()),
        );
        let value = b.add_value(property, format!("value-{i}"));
        b.set_value_description(value, format!("Only value of property {i}."));
        b.set_default_value(property, value);
        selections[slot].push(value);
    }

    let profiles: Vec<BuilderId> = components
        .iter()
        .zip(&selections)
        .enumerate()
        .map(|(i, (&component, values))| {
            let profile = b.add_profile(component, 5000 + i as u32, values);
            b.set_default_profile(component, profile);
            profile
        })
        .collect();

    let node = b.add_node("Premium/1.0", None);
    b.add_signature(&[node], &profiles, 1);
    b
}

pub fn premium_dataset() -> Arc<Dataset> {
    let bytes = premium_builder().build().expect("premium fixture builds");
    Arc::new(Dataset::from_bytes(bytes).expect("premium fixture loads"))
}
