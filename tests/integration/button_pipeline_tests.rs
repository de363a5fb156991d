//! Raw line levels through debounce and edge detection to bus events and
//! the state manager's hold layer.

use sensehub::drivers::button::ButtonId;
use sensehub::events::{ButtonA, ButtonX, Event};

use crate::mock_hw::{names, Hub};

fn button_events(events: &[Event]) -> Vec<&'static str> {
    names(events)
        .into_iter()
        .filter(|name| name.starts_with("Button"))
        .collect()
}

#[test]
fn bouncy_press_publishes_one_edge_each_way() {
    let mut hub = Hub::new();

    // Contact bounce: flips every tick, shorter than the debounce interval.
    for pressed in [true, false, true, false, true] {
        hub.env.set_button(ButtonId::A, pressed);
        hub.advance_ms(10);
    }
    hub.advance_ms(100);
    for pressed in [false, true, false] {
        hub.env.set_button(ButtonId::A, pressed);
        hub.advance_ms(10);
    }
    hub.advance_ms(100);

    let events = hub.take_events();
    assert_eq!(button_events(&events), vec!["ButtonA", "ButtonA"]);
    assert!(events.contains(&Event::from(ButtonA::new(true))));
    assert!(events.contains(&Event::from(ButtonA::new(false))));
}

#[test]
fn glitch_shorter_than_debounce_is_ignored() {
    let mut hub = Hub::new();
    hub.env.set_button(ButtonId::X, true);
    hub.advance_ms(20);
    hub.env.set_button(ButtonId::X, false);
    hub.advance_ms(200);
    assert!(button_events(&hub.take_events()).is_empty());
}

#[test]
fn hold_layer_lasts_until_the_last_button_is_released() {
    let mut hub = Hub::new();

    hub.env.set_button(ButtonId::A, true);
    hub.advance_ms(100);
    hub.env.set_button(ButtonId::X, true);
    hub.advance_ms(100);
    assert_eq!(hub.led.state().rgb, (255, 255, 255));

    hub.env.set_button(ButtonId::A, false);
    hub.advance_ms(100);
    assert_eq!(hub.led.state().rgb, (255, 255, 255), "X still held");

    hub.env.set_button(ButtonId::X, false);
    hub.advance_ms(100);
    assert_ne!(hub.led.state().rgb, (255, 255, 255));

    let events = hub.take_events();
    assert_eq!(
        button_events(&events),
        vec!["ButtonA", "ButtonX", "ButtonA", "ButtonX"]
    );
    assert!(events.contains(&Event::from(ButtonX::new(false))));
}
