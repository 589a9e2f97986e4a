//! Composed scene units and their concatenation into a timeline

use crate::report::AssetState;
use crate::track::{AudioTrack, Release, TrackKind, VisualTrack};
use crate::{Error, Result};

/// One scene ready for export: a picture, optional narration and a duration
#[derive(Debug)]
pub struct ComposedSceneUnit {
    scene_number: u32,
    visual: VisualTrack,
    audio: Option<AudioTrack>,
    duration: f64,
    image_state: AssetState,
    audio_state: AssetState,
    released: bool,
}

impl ComposedSceneUnit {
    /// Creates a unit. `duration` must be positive.
    pub fn new(
        scene_number: u32,
        visual: VisualTrack,
        audio: Option<AudioTrack>,
        duration: f64,
    ) -> Self {
        debug_assert!(duration > 0.0, "scene duration must be positive");
        let image_state = if visual.is_filler() {
            AssetState::Missing
        } else {
            AssetState::Loaded
        };
        let audio_state = if audio.is_some() {
            AssetState::Loaded
        } else {
            AssetState::Missing
        };

        Self {
            scene_number,
            visual,
            audio,
            duration,
            image_state,
            audio_state,
            released: false,
        }
    }

    /// Overrides how the image and audio were obtained, for reporting
    pub fn with_states(mut self, image_state: AssetState, audio_state: AssetState) -> Self {
        self.image_state = image_state;
        self.audio_state = audio_state;
        self
    }

    /// Scene number this unit was composed from
    pub fn scene_number(&self) -> u32 {
        self.scene_number
    }

    /// Picture track
    pub fn visual(&self) -> &VisualTrack {
        &self.visual
    }

    /// Narration track, if any
    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    /// Mutable narration track, if any
    pub fn audio_mut(&mut self) -> Option<&mut AudioTrack> {
        self.audio.as_mut()
    }

    /// Effective scene duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// How the image was obtained
    pub fn image_state(&self) -> AssetState {
        self.image_state
    }

    /// How the narration was obtained
    pub fn audio_state(&self) -> AssetState {
        self.audio_state
    }
}

impl Release for ComposedSceneUnit {
    fn kind(&self) -> TrackKind {
        TrackKind::Composite
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::AlreadyReleased(TrackKind::Composite));
        }
        self.released = true;

        let mut failures = Vec::new();
        if let Err(e) = self.visual.release() {
            failures.push(e);
        }
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.release() {
                failures.push(e);
            }
        }
        collect_failures(TrackKind::Composite, failures)
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

/// Scene units played back to back, in the order they were supplied
#[derive(Debug)]
pub struct Timeline {
    units: Vec<ComposedSceneUnit>,
    released: bool,
}

impl Timeline {
    /// Concatenates units without reordering, trimming or cross-fading.
    ///
    /// An empty list is refused with [`Error::EmptyTimeline`].
    pub fn assemble(units: Vec<ComposedSceneUnit>) -> Result<Self> {
        if units.is_empty() {
            return Err(Error::EmptyTimeline);
        }
        Ok(Self {
            units,
            released: false,
        })
    }

    /// Units in playback order
    pub fn units(&self) -> &[ComposedSceneUnit] {
        &self.units
    }

    /// Mutable units in playback order
    pub fn units_mut(&mut self) -> &mut [ComposedSceneUnit] {
        &mut self.units
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Always false for an assembled timeline
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Sum of unit durations in seconds
    pub fn total_duration(&self) -> f64 {
        self.units.iter().map(|u| u.duration()).sum()
    }

    /// Start offset of every unit in seconds
    pub fn start_times(&self) -> Vec<f64> {
        let mut start = 0.0;
        self.units
            .iter()
            .map(|u| {
                let at = start;
                start += u.duration();
                at
            })
            .collect()
    }

    /// Scene numbers in playback order
    pub fn scene_numbers(&self) -> Vec<u32> {
        self.units.iter().map(|u| u.scene_number()).collect()
    }

    /// Whether any unit carries narration
    pub fn has_audio(&self) -> bool {
        self.units.iter().any(|u| u.audio().is_some())
    }
}

impl Release for Timeline {
    fn kind(&self) -> TrackKind {
        TrackKind::Timeline
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::AlreadyReleased(TrackKind::Timeline));
        }
        self.released = true;

        let failures = self
            .units
            .iter_mut()
            .filter_map(|unit| unit.release().err())
            .collect();
        collect_failures(TrackKind::Timeline, failures)
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

/// Folds child release failures into a single error for the parent
fn collect_failures(kind: TrackKind, failures: Vec<Error>) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    let reason = failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::Release { kind, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FrameSize;

    fn unit(scene_number: u32, duration: f64) -> ComposedSceneUnit {
        ComposedSceneUnit::new(
            scene_number,
            VisualTrack::filler(FrameSize::new(16, 9), duration),
            None,
            duration,
        )
    }

    #[test]
    fn test_empty_timeline_is_refused() {
        assert!(matches!(
            Timeline::assemble(Vec::new()),
            Err(Error::EmptyTimeline)
        ));
    }

    #[test]
    fn test_order_and_durations_are_preserved() {
        let timeline = Timeline::assemble(vec![unit(3, 2.0), unit(1, 5.0), unit(2, 0.5)]).unwrap();

        assert_eq!(timeline.scene_numbers(), vec![3, 1, 2]);
        assert_eq!(timeline.start_times(), vec![0.0, 2.0, 7.0]);
        assert!((timeline.total_duration() - 7.5).abs() < 1e-9);
        assert!(!timeline.has_audio());
    }

    #[test]
    fn test_unit_states_follow_tracks() {
        let unit = unit(1, 5.0);
        assert_eq!(unit.image_state(), AssetState::Missing);
        assert_eq!(unit.audio_state(), AssetState::Missing);

        let unit = unit.with_states(AssetState::Unreadable, AssetState::Fallback);
        assert_eq!(unit.image_state(), AssetState::Unreadable);
        assert_eq!(unit.audio_state(), AssetState::Fallback);
    }

    #[test]
    fn test_timeline_release_cascades_once() {
        let mut timeline = Timeline::assemble(vec![unit(1, 1.0), unit(2, 1.0)]).unwrap();
        timeline.release().unwrap();

        assert!(timeline.units().iter().all(|u| u.is_released()));
        assert!(timeline.units().iter().all(|u| u.visual().is_released()));
        assert!(matches!(
            timeline.release(),
            Err(Error::AlreadyReleased(TrackKind::Timeline))
        ));
    }

    #[test]
    fn test_released_unit_reports_failure_to_timeline() {
        let mut timeline = Timeline::assemble(vec![unit(1, 1.0), unit(2, 1.0)]).unwrap();
        timeline.units_mut()[0].release().unwrap();

        let err = timeline.release().unwrap_err();
        assert!(matches!(
            err,
            Error::Release {
                kind: TrackKind::Timeline,
                ..
            }
        ));
        assert!(timeline.units()[1].is_released());
    }
}
