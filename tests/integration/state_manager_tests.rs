//! End-to-end state manager scenarios: readings, buttons and timers go in
//! through the bus, mode changes and LED output come out.

use sensehub::config::HubConfig;
use sensehub::drivers::button::ButtonId;
use sensehub::events::{
    AirQuality, AirQualityThreshold, AlarmStateChange, ControlAction, DemoModeTimerExpired, Event,
    StateManagerControl, TimerToken,
};
use sensehub::sensors::air_quality::led_value_for_score;
use sensehub::state_manager::ModeId;

use crate::mock_hw::{morse_requests, Hub};

fn rgb_for_score(score: u16) -> (u8, u8, u8) {
    let v = led_value_for_score(score);
    (v.r, v.g, v.b)
}

fn mode(hub: &Hub) -> Option<ModeId> {
    hub.status.current().map(|s| s.mode)
}

// ── Alarm ─────────────────────────────────────────────────────

#[test]
fn alarm_announces_repeats_and_is_silenced_by_x() {
    let mut hub = Hub::new();

    hub.publish(AirQuality { score: 100 });
    let events = hub.take_events();
    assert_eq!(morse_requests(&events), vec!["100"]);
    assert!(events.contains(&Event::from(AlarmStateChange { alarm: true })));
    assert_eq!(mode(&hub), Some(ModeId::Alarm));
    assert_eq!(hub.led.state().rgb, rgb_for_score(100));

    // "100" is 64 dits long: done well within 5 s, then the repeat timer
    // is armed.
    hub.advance_ms(5_000);
    assert!(hub.morse_idle());
    assert!(hub.timer_pending(TimerToken::REPEAT_ALARM));
    hub.take_events();

    hub.advance_ms(30_000);
    assert_eq!(morse_requests(&hub.take_events()), vec!["100"]);

    hub.click(ButtonId::X);
    let events = hub.take_events();
    assert!(events.contains(&Event::from(AlarmStateChange { alarm: false })));
    assert!(hub.timer_pending(TimerToken::SILENCE_ALARM));
    let state = hub.status.current().unwrap();
    assert_eq!(state.mode, ModeId::Monitor);
    assert!(!state.alarm);
    assert!(hub.led.state().on);

    // Silenced: a bad reading does not raise the alarm.
    hub.publish(AirQuality { score: 100 });
    assert_eq!(mode(&hub), Some(ModeId::Monitor));

    // Silence over: the next bad reading alarms again.
    hub.advance_ms(61_000);
    assert!(!hub.timer_pending(TimerToken::SILENCE_ALARM));
    hub.take_events();
    hub.publish(AirQuality { score: 100 });
    assert_eq!(mode(&hub), Some(ModeId::Alarm));
    assert_eq!(morse_requests(&hub.take_events()), vec!["100"]);
}

#[test]
fn alarm_clears_when_air_recovers() {
    let mut hub = Hub::new();
    hub.publish(AirQuality { score: 100 });
    assert_eq!(mode(&hub), Some(ModeId::Alarm));

    // Smoothed: 100 -> 325 (still inside the hysteresis band) -> 493.
    hub.publish(AirQuality { score: 1000 });
    assert_eq!(mode(&hub), Some(ModeId::Alarm));
    hub.take_events();

    hub.publish(AirQuality { score: 1000 });
    let events = hub.take_events();
    assert!(events.contains(&Event::from(AlarmStateChange { alarm: false })));
    let state = hub.status.current().unwrap();
    assert_eq!(state.mode, ModeId::Monitor);
    assert_eq!(state.air_quality, Some(493));
    assert_eq!(hub.led.state().rgb, rgb_for_score(493));
    assert!(hub.led.state().on);
}

// ── Threshold editing ─────────────────────────────────────────

#[test]
fn threshold_editing_times_out_into_readout() {
    let mut hub = Hub::new();

    hub.click(ButtonId::A);
    assert_eq!(mode(&hub), Some(ModeId::Threshold));
    assert_eq!(hub.led.state().rgb, rgb_for_score(256));

    hub.click(ButtonId::A);
    assert_eq!(hub.status.current().unwrap().alarm_threshold, 384);
    assert_eq!(hub.led.state().rgb, rgb_for_score(384));
    hub.take_events();

    hub.advance_ms(3_500);
    assert_eq!(mode(&hub), Some(ModeId::MorseReadout));
    assert_eq!(morse_requests(&hub.take_events()), vec!["TTT"]);

    hub.advance_ms(2_000);
    assert!(hub.morse_idle());
    let state = hub.status.current().unwrap();
    assert_eq!(state.mode, ModeId::Monitor);
    assert_eq!(state.alarm_threshold, 384);
}

#[test]
fn x_leaves_threshold_editing_immediately() {
    let mut hub = Hub::new();
    hub.click(ButtonId::B);
    assert_eq!(hub.status.current().unwrap().alarm_threshold, 256);
    hub.click(ButtonId::B);
    assert_eq!(hub.status.current().unwrap().alarm_threshold, 128);

    hub.click(ButtonId::X);
    assert_eq!(mode(&hub), Some(ModeId::Monitor));

    // The pending threshold timeout no longer matters outside the editor.
    hub.advance_ms(4_000);
    assert_eq!(mode(&hub), Some(ModeId::Monitor));
}

#[test]
fn led_is_white_while_a_button_is_held() {
    let mut hub = Hub::new();
    hub.publish(AirQuality { score: 800 });

    hub.env.set_button(ButtonId::Y, true);
    hub.advance_ms(100);
    assert_eq!(hub.led.state().rgb, (255, 255, 255));

    hub.env.set_button(ButtonId::Y, false);
    hub.advance_ms(100);
    assert_ne!(hub.led.state().rgb, (255, 255, 255));
}

// ── Readout ───────────────────────────────────────────────────

#[test]
fn y_reads_out_air_quality_then_returns() {
    let mut hub = Hub::new();
    hub.publish(AirQuality { score: 700 });
    hub.take_events();

    hub.click(ButtonId::Y);
    assert_eq!(mode(&hub), Some(ModeId::MorseReadout));
    assert_eq!(morse_requests(&hub.take_events()), vec!["AQ VERY GOOD 700"]);

    hub.advance_ms(30_000);
    assert!(hub.morse_idle());
    assert_eq!(mode(&hub), Some(ModeId::Monitor));
    assert!(hub.led.state().on);
}

#[test]
fn y_without_a_reading_does_nothing() {
    let mut hub = Hub::new();
    hub.click(ButtonId::Y);
    assert!(morse_requests(&hub.take_events()).is_empty());
    assert_eq!(hub.status.current(), None);
}

// ── Remote control ────────────────────────────────────────────

#[test]
fn remote_controls_reach_the_state_manager() {
    let mut hub = Hub::new();

    hub.publish(StateManagerControl {
        action: ControlAction::IncrementThreshold,
    });
    let state = hub.status.current().unwrap();
    assert_eq!(state.mode, ModeId::Monitor);
    assert_eq!(state.alarm_threshold, 384);
    assert_eq!(hub.led.state().rgb, rgb_for_score(384));

    hub.publish(AirQualityThreshold {
        alarm: 512,
        silence: 640,
    });
    assert_eq!(hub.status.current().unwrap().alarm_threshold, 512);

    // Inverted pair is rejected.
    hub.publish(AirQualityThreshold {
        alarm: 700,
        silence: 600,
    });
    assert_eq!(hub.status.current().unwrap().alarm_threshold, 512);

    hub.publish(AirQuality { score: 500 });
    assert!(hub.status.current().unwrap().alarm);
}

// ── Demo mode ─────────────────────────────────────────────────

#[test]
fn demo_rotation_owns_the_led_until_it_expires() {
    let config = HubConfig {
        demo_mode_secs: 1,
        ..HubConfig::default()
    };
    let mut hub = Hub::with_config(&config);
    hub.publish(AirQuality { score: 800 });

    hub.advance_ms(500);
    let demo_colour = hub.led.state().rgb;
    assert_ne!(demo_colour, rgb_for_score(800));
    assert_ne!(demo_colour, (0, 0, 0));

    hub.advance_ms(600);
    assert_eq!(hub.led.state().rgb, rgb_for_score(800));
    let events = hub.take_events();
    assert!(events.contains(&Event::from(DemoModeTimerExpired)));
}
