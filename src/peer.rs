use serde::{Deserialize, Serialize};

use crate::constants::{
    BASE_ALTITUDE, BASE_LATITUDE, BASE_LONGITUDE, POSITION_STEP_DEG,
};

/// Identifier of a node on the broadcast domain. Operators pick it at
/// startup; nothing checks it for uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u32);

impl PeerId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for PeerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for PeerId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

/// Geodetic position: degrees for lat/lon, metres for altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Position a node advertises when none is configured, spread out by id
    /// so a handful of local nodes are distinguishable on the status view.
    pub fn derived_from(id: PeerId) -> Self {
        let n = id.0 as f64;
        Self {
            lat: BASE_LATITUDE + n * POSITION_STEP_DEG,
            lon: BASE_LONGITUDE + n * POSITION_STEP_DEG,
            alt: BASE_ALTITUDE + n,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}/{:.5} @ {:.1}m", self.lat, self.lon, self.alt)
    }
}
