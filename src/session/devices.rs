use super::recorder::ExclusiveRecorder;
use crate::annotation::AnnotationPipeline;
use crate::audio::{AudioPlayback, AudioRecorder};
use crate::presentation::SessionUi;
use crate::voice::VoiceActivity;

/// Every outside collaborator a session drives, borrowed for its duration.
pub struct SessionDevices<'a> {
    pub ui: &'a mut dyn SessionUi,
    pub recorder: ExclusiveRecorder<'a>,
    pub playback: &'a mut dyn AudioPlayback,
    pub voice: &'a dyn VoiceActivity,
    pub pipeline: &'a mut dyn AnnotationPipeline,
}

impl<'a> SessionDevices<'a> {
    pub fn new(
        ui: &'a mut dyn SessionUi,
        recorder: &'a mut dyn AudioRecorder,
        playback: &'a mut dyn AudioPlayback,
        voice: &'a dyn VoiceActivity,
        pipeline: &'a mut dyn AnnotationPipeline,
    ) -> Self {
        Self {
            ui,
            recorder: ExclusiveRecorder::new(recorder),
            playback,
            voice,
            pipeline,
        }
    }
}
