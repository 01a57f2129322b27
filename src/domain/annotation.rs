// Label placement for the state timeline
use serde::Serialize;

use super::state::DeviceState;

pub const DEFAULT_ANNOTATION_OFFSET: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub position: usize,
    pub side: Side,
    /// Vertical offset in display units, positive above the bar.
    pub offset: f64,
}

/// Decide where to label the start of each OFF run.
///
/// Only the first segment of an OFF run is labelled, and labels alternate
/// above and below the bar so that neighbouring runs don't collide.
pub fn place_annotations<I>(segments: I, offset: f64) -> Vec<Placement>
where
    I: IntoIterator<Item = (usize, DeviceState)>,
{
    let mut placements = Vec::new();
    let mut previous: Option<DeviceState> = None;
    let mut above = true;

    for (position, state) in segments {
        if state == DeviceState::Off && previous != Some(DeviceState::Off) {
            let (side, offset) = if above {
                (Side::Above, offset)
            } else {
                (Side::Below, -offset)
            };
            placements.push(Placement {
                position,
                side,
                offset,
            });
            above = !above;
        }

        previous = Some(state);
    }

    placements
}
