//! Periodic sensor sampling.
//!
//! Runs on its own thread because the air sensor's `measure` blocks for the
//! whole conversion.  Each period reads, in order, ambient light, proximity
//! and the air sensor, and publishes one event per successful read.  A
//! failed read is logged and only that event is skipped.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embassy_time::{Duration, Instant};
use log::{info, warn};

use crate::app::ports::{AirSensor, AmbientLightSensor, ProximitySensor};
use crate::config::HubConfig;
use crate::error::SensorError;
use crate::events::{AirQuality, AmbientLightSample, Event, EventBus, ProximitySample};
use crate::sensors::air_quality::AirQualityTracker;
use crate::stats::SimpleMovingAverage;

/// Samples averaged before an ambient light reading is published.
const LIGHT_WINDOW: usize = 4;
/// Scores averaged before an air quality reading is published.
const SCORE_WINDOW: usize = 3;

pub struct SamplingLoop<L, P, A> {
    bus: Arc<EventBus>,
    light: L,
    proximity: P,
    air: A,
    tracker: AirQualityTracker,
    light_average: Option<SimpleMovingAverage<f32, LIGHT_WINDOW>>,
    score_average: Option<SimpleMovingAverage<u16, SCORE_WINDOW>>,
    period: Duration,
}

impl<L, P, A> SamplingLoop<L, P, A>
where
    L: AmbientLightSensor,
    P: ProximitySensor,
    A: AirSensor,
{
    pub fn new(bus: Arc<EventBus>, light: L, proximity: P, air: A, config: &HubConfig) -> Self {
        Self {
            bus,
            light,
            proximity,
            air,
            tracker: AirQualityTracker::new(),
            light_average: None,
            score_average: None,
            period: Duration::from_millis(u64::from(config.sample_interval_ms)),
        }
    }

    /// Enable sensors that need it.
    pub fn start(&mut self) -> Result<(), SensorError> {
        self.proximity.enable()?;
        info!("Sampling: started, period {}ms", self.period.as_millis());
        Ok(())
    }

    /// One sampling period.
    pub fn sample_once(&mut self) {
        self.read_ambient_light();
        self.read_proximity();
        self.read_air_sensor();
    }

    /// Sample every period until `stop` is set.  Deadlines are anchored so
    /// a slow measurement does not shift later periods.
    pub fn run(mut self, stop: &AtomicBool) {
        let mut deadline = Instant::now();
        while !stop.load(Ordering::Acquire) {
            deadline += self.period;
            let now = Instant::now();
            if deadline > now {
                let wait = deadline - now;
                std::thread::sleep(std::time::Duration::from_micros(wait.as_micros()));
            }
            self.sample_once();
        }
        if let Err(e) = self.proximity.disable() {
            warn!("Sampling: failed to disable proximity sensor: {}", e);
        }
        info!("Sampling: stopped");
    }

    fn read_ambient_light(&mut self) {
        let lux = match self.light.read_sample_lux() {
            Ok(lux) => lux,
            Err(e) => {
                warn!("Failed to read ambient light sensor sample: {}", e);
                return;
            }
        };
        let average = self
            .light_average
            .get_or_insert_with(|| SimpleMovingAverage::new(lux));
        average.update(lux);
        let sample_lux = average.average();
        self.publish(AmbientLightSample { sample_lux });
    }

    fn read_proximity(&mut self) {
        match self.proximity.read_sample() {
            Ok(sample) => self.publish(ProximitySample { sample }),
            Err(e) => warn!("Failed to read proximity sensor sample: {}", e),
        }
    }

    fn read_air_sensor(&mut self) {
        let measurement = match self.air.measure() {
            Ok(m) => m,
            Err(e) => {
                warn!("Failed to read air sensor score: {}", e);
                return;
            }
        };
        let score = self.tracker.record(measurement);
        let average = self
            .score_average
            .get_or_insert_with(|| SimpleMovingAverage::new(score));
        average.update(score);
        let score = average.average();
        self.publish(AirQuality { score });
    }

    fn publish<E: Into<Event> + core::fmt::Debug + Copy>(&self, event: E) {
        if !self.bus.publish(event) {
            warn!("Sampling: dropped {:?}", event);
        }
    }
}
