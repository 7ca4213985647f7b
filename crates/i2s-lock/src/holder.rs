/// The logical device that owns the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Holder {
    /// The microphone path.
    Capture = 1,
    /// The speaker path.
    Playback = 2,
}

impl Holder {
    pub(crate) const fn id(self) -> u8 {
        self as u8
    }

    pub(crate) const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Capture),
            2 => Some(Self::Playback),
            _ => None,
        }
    }
}
