//! Fuzz target: `HubConfig::from_json` and `HubConfig::from_postcard`
//!
//! Feeds arbitrary bytes to both decoders and checks:
//! - No panics under any byte sequence
//! - Anything accepted passes `validate()` again
//! - An accepted config survives a postcard round trip unchanged
//!
//! cargo fuzz run fuzz_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensehub::config::HubConfig;

fn check(config: &HubConfig) {
    assert!(config.validate().is_ok());
    let bytes = config.to_postcard().expect("encoding an accepted config");
    let back = HubConfig::from_postcard(&bytes).expect("re-decoding an accepted config");
    assert_eq!(&back, config);
}

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = HubConfig::from_postcard(data) {
        check(&config);
    }
    if let Ok(text) = core::str::from_utf8(data) {
        if let Ok(config) = HubConfig::from_json(text) {
            check(&config);
        }
    }
});
