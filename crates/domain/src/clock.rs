//! Game clock (§4.2). Pure arithmetic over an in-game minute counter — no RNG
//! dependency here (the weather roll is injected by the caller, the same
//! closure-injection idiom the teacher uses elsewhere to keep this crate free
//! of `rand`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Band for `hour_of_day` (0..24) by the fixed thresholds in §4.2.
    pub fn for_hour(hour_of_day: u32) -> Self {
        match hour_of_day {
            h if h < 6 => TimeOfDay::Night,
            h if h < 12 => TimeOfDay::Morning,
            h if h < 18 => TimeOfDay::Afternoon,
            h if h < 22 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    fn next(self) -> Self {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Clear,
    Cloudy,
    Rain,
    Storm,
    Fog,
    Snow,
}

impl Weather {
    /// Table-driven weather transition (§4.2: "table-driven state machine").
    /// `roll` is a uniform draw in `[0, 1)` from the weather RNG sub-stream.
    fn transition(self, roll: f64) -> Self {
        let options: &[Weather] = match self {
            Weather::Clear => &[Weather::Clear, Weather::Cloudy, Weather::Fog],
            Weather::Cloudy => &[Weather::Cloudy, Weather::Rain, Weather::Clear],
            Weather::Rain => &[Weather::Rain, Weather::Storm, Weather::Cloudy],
            Weather::Storm => &[Weather::Storm, Weather::Rain],
            Weather::Fog => &[Weather::Fog, Weather::Clear, Weather::Cloudy],
            Weather::Snow => &[Weather::Snow, Weather::Cloudy, Weather::Clear],
        };
        let idx = ((roll * options.len() as f64) as usize).min(options.len() - 1);
        options[idx]
    }
}

const MINUTES_PER_DAY: u64 = 24 * 60;
const DAYS_PER_SEASON: u64 = 28;
/// Probability per `advance` call that weather is re-rolled (§4.2: "with low
/// fixed probability").
pub const WEATHER_CHANGE_CHANCE: f64 = 0.05;

/// A single minute counter plus the derived calendar/weather state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameClock {
    total_minutes: u64,
    pub time_of_day: TimeOfDay,
    pub day: u64,
    pub season: Season,
    pub year: u64,
    pub weather: Weather,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            total_minutes: 6 * 60,
            time_of_day: TimeOfDay::Morning,
            day: 1,
            season: Season::Spring,
            year: 1,
            weather: Weather::Clear,
        }
    }
}

/// What changed during one `advance` call, used by the caller to decide
/// whether to publish `time_changed` (§4.2: "emits time_changed events only
/// when a band actually changes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTransition {
    pub band_changed: bool,
    pub day_rolled: bool,
    pub weather_changed: bool,
}

impl GameClock {
    pub fn total_minutes(&self) -> u64 {
        self.total_minutes
    }

    pub fn minute_of_day(&self) -> u64 {
        self.total_minutes % MINUTES_PER_DAY
    }

    pub fn hour_of_day(&self) -> u32 {
        (self.minute_of_day() / 60) as u32
    }

    /// Formats as `HH:MM`, matching §6's `gameTimeString`.
    pub fn as_hh_mm(&self) -> String {
        format!("{:02}:{:02}", self.hour_of_day(), self.minute_of_day() % 60)
    }

    /// Advances the clock by `delta` minutes, rolling over day/season/year
    /// boundaries and (with `weather_roll_should_change` true, drawn by the
    /// caller from the weather RNG sub-stream at `WEATHER_CHANGE_CHANCE`)
    /// transitioning weather using `weather_transition_roll`.
    pub fn advance(
        &mut self,
        delta: u64,
        weather_roll_should_change: bool,
        weather_transition_roll: f64,
    ) -> ClockTransition {
        let previous_band = self.time_of_day;
        let previous_day_index = self.total_minutes / MINUTES_PER_DAY;

        self.total_minutes += delta;

        let new_day_index = self.total_minutes / MINUTES_PER_DAY;
        let day_rolled = new_day_index > previous_day_index;
        if day_rolled {
            let days_elapsed = new_day_index - previous_day_index;
            self.day += days_elapsed;
            while self.day > DAYS_PER_SEASON {
                self.day -= DAYS_PER_SEASON;
                let wrapped_to_spring = self.season == Season::Winter;
                self.season = self.season.next();
                if wrapped_to_spring {
                    self.year += 1;
                }
            }
        }

        self.time_of_day = TimeOfDay::for_hour(self.hour_of_day());
        let band_changed = self.time_of_day != previous_band;

        let weather_changed = if weather_roll_should_change {
            let next = self.weather.transition(weather_transition_roll);
            let changed = next != self.weather;
            self.weather = next;
            changed
        } else {
            false
        };

        ClockTransition {
            band_changed,
            day_rolled,
            weather_changed,
        }
    }
}
