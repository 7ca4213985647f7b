/// Recoverable conditions raised by the capture and playback paths.
///
/// None of these are fatal; they are carried as a device warning until the
/// next successful operation clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioError {
    /// The driver refused to begin the capture or playback path.
    StartFailed,
    /// The driver refused to start a record transaction.
    RecordFailed,
    /// A record transaction did not complete within its budget.
    RecordTimeout,
    /// The driver refused a playback unit.
    PlaybackFailed,
    /// A playback unit did not finish within its budget.
    PlaybackTimeout,
    /// A queued chunk had an unusable length (in bytes).
    InvalidChunk(usize),
    /// The streaming worker could not be launched.
    LaunchFailed,
    /// The device configuration was rejected at setup.
    InvalidConfig,
}
