//! Engine-side wrapper around `wrldbldr_domain::GameClock` (§4.2): draws the
//! weather roll from the named RNG stream and turns a band/weather change
//! into a `time_changed` event.

use wrldbldr_domain::{event_kind, ClockTransition, DomainEvent, GameClock, WEATHER_CHANGE_CHANCE};

use crate::rng::{DeterministicRng, RngStream};

pub struct Clock {
    inner: GameClock,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            inner: GameClock::default(),
        }
    }
}

impl Clock {
    pub fn get(&self) -> &GameClock {
        &self.inner
    }

    /// Advances the clock by `delta` minutes. Returns a `time_changed` event
    /// iff the time-of-day band changed (§4.2: "emits time_changed events
    /// only when a band actually changes to avoid churn"); `delta` is always
    /// reported in the event metadata regardless.
    pub fn advance(&mut self, delta: u64, frame: u64, rng: &mut DeterministicRng) -> Option<DomainEvent> {
        let roll_for_change = rng.gen_f64(RngStream::Weather);
        let should_change_weather = roll_for_change < WEATHER_CHANGE_CHANCE;
        let transition_roll = rng.gen_f64(RngStream::Weather);

        let ClockTransition {
            band_changed,
            day_rolled: _,
            weather_changed: _,
        } = self.inner.advance(delta, should_change_weather, transition_roll);

        if !band_changed {
            return None;
        }

        Some(DomainEvent::new(
            frame,
            event_kind::TIME_CHANGED,
            serde_json::json!({
                "delta": delta,
                "gameTime": self.inner.total_minutes(),
                "gameTimeString": self.inner.as_hh_mm(),
                "timeOfDay": format!("{:?}", self.inner.time_of_day).to_lowercase(),
                "day": self.inner.day,
                "season": format!("{:?}", self.inner.season).to_lowercase(),
                "year": self.inner.year,
                "weather": format!("{:?}", self.inner.weather).to_lowercase(),
            }),
            None,
        ))
    }
}
