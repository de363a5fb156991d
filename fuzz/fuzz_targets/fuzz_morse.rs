//! Fuzz target: Morse encoder over arbitrary text
//!
//! Builds a `MorseMessage` from arbitrary UTF-8 and runs the encoder to
//! completion, checking:
//! - No panics for any input, including non-ASCII and control characters
//! - The encoder always finishes, ending dark with one finished marker
//! - On/off edges alternate
//!
//! cargo fuzz run fuzz_morse

#![no_main]

use embassy_time::Instant;
use libfuzzer_sys::fuzz_target;
use sensehub::events::MorseMessage;
use sensehub::morse_code::{Encoder, MorseOutput};

struct Edges(Vec<(bool, bool)>);

impl MorseOutput for &mut Edges {
    fn emit(&mut self, turn_on: bool, message_finished: bool) {
        self.0.push((turn_on, message_finished));
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&repeat, text)) = data.split_first() else {
        return;
    };
    let text = String::from_utf8_lossy(text);
    let repeat = u32::from(repeat % 3) + 1;

    let mut edges = Edges(Vec::new());
    {
        let mut encoder = Encoder::new(&mut edges);
        encoder.encode(MorseMessage::new(&text), repeat, 1, Instant::from_millis(0));
        let mut now = 0;
        while !encoder.is_idle() {
            now += 1;
            assert!(now < 10_000_000, "encoder never finished");
            encoder.poll(Instant::from_millis(now));
        }
    }

    let (last, body) = edges.0.split_last().expect("at least the finished marker");
    assert_eq!(*last, (false, true));
    let mut on = false;
    for &(turn_on, finished) in body {
        assert!(!finished);
        assert_ne!(turn_on, on);
        on = turn_on;
    }
});
