use crate::AudioError;

/// Lifecycle of a capture or playback device.
///
/// `Starting` and `Stopping` are requests; the next poll step resolves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Health flags reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    warning: Option<AudioError>,
    failed: bool,
}

impl DeviceStatus {
    pub fn warning(&self) -> Option<AudioError> {
        self.warning
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub(crate) fn set_warning(&mut self, error: AudioError) {
        self.warning = Some(error);
    }

    pub(crate) fn clear_warning(&mut self) {
        self.warning = None;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.failed = true;
    }
}
