//! WiFi channel congestion survey.
//!
//! Built from the access points seen in a station scan. Used to log whether
//! the camera's network shares its channel with many neighbours, since a
//! congested 2.4 GHz channel is the usual cause of a stuttering stream.

/// Highest 2.4 GHz channel considered.
pub const MAX_CHANNEL: u8 = 13;

/// Non-overlapping 2.4 GHz channels, in preference order.
pub const RECOMMENDED_CHANNELS: [u8; 3] = [1, 6, 11];

/// Access point count above which our channel is considered congested.
pub const CONGESTED_AP_COUNT: usize = 3;

/// One access point seen in a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApSighting {
    pub ssid: String,
    pub channel: u8,
    pub rssi: i8,
}

/// Coarse congestion level of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Congestion {
    Low,
    Medium,
    High,
}

impl Congestion {
    pub fn from_count(count: usize) -> Self {
        match count {
            0..=2 => Congestion::Low,
            3..=5 => Congestion::Medium,
            _ => Congestion::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Congestion::Low => "Low",
            Congestion::Medium => "Medium",
            Congestion::High => "High",
        }
    }
}

/// Findings for the network the camera joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReport {
    pub channel: u8,
    pub rssi: i8,
    /// Access points on our channel, ours included.
    pub aps_on_channel: usize,
    pub congested: bool,
    /// Better channel among [`RECOMMENDED_CHANNELS`] when one exists.
    pub recommendation: Option<u8>,
}

/// Access point counts per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSurvey {
    counts: [usize; MAX_CHANNEL as usize],
    sightings: Vec<ApSighting>,
}

impl ChannelSurvey {
    /// Tally a scan. Channels outside 1..=13 are ignored.
    pub fn from_sightings(sightings: impl IntoIterator<Item = ApSighting>) -> Self {
        let mut survey = Self::default();
        for ap in sightings {
            if (1..=MAX_CHANNEL).contains(&ap.channel) {
                survey.counts[(ap.channel - 1) as usize] += 1;
                survey.sightings.push(ap);
            }
        }
        survey
    }

    /// Number of access points on `channel`.
    pub fn count(&self, channel: u8) -> usize {
        match channel {
            1..=MAX_CHANNEL => self.counts[(channel - 1) as usize],
            _ => 0,
        }
    }

    pub fn congestion(&self, channel: u8) -> Congestion {
        Congestion::from_count(self.count(channel))
    }

    /// `(channel, count, congestion)` for every channel with at least one AP.
    pub fn occupied(&self) -> impl Iterator<Item = (u8, usize, Congestion)> + '_ {
        (1..=MAX_CHANNEL)
            .map(|ch| (ch, self.count(ch)))
            .filter(|(_, count)| *count > 0)
            .map(|(ch, count)| (ch, count, Congestion::from_count(count)))
    }

    /// The least crowded of the non-overlapping channels. Ties keep the
    /// earlier channel.
    pub fn least_congested(&self) -> u8 {
        let mut best = RECOMMENDED_CHANNELS[0];
        for ch in RECOMMENDED_CHANNELS {
            if self.count(ch) < self.count(best) {
                best = ch;
            }
        }
        best
    }

    /// Report for the network named `ssid`, if it was seen.
    ///
    /// The strongest sighting is used when several APs share the SSID.
    pub fn report_for(&self, ssid: &str) -> Option<NetworkReport> {
        let ours = self
            .sightings
            .iter()
            .filter(|ap| ap.ssid == ssid)
            .max_by_key(|ap| ap.rssi)?;

        let aps_on_channel = self.count(ours.channel);
        let congested = aps_on_channel > CONGESTED_AP_COUNT;
        let recommendation = if congested {
            Some(self.least_congested()).filter(|ch| *ch != ours.channel)
        } else {
            None
        };

        Some(NetworkReport {
            channel: ours.channel,
            rssi: ours.rssi,
            aps_on_channel,
            congested,
            recommendation,
        })
    }
}
