
/// Frame decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Frame shorter than its header
    NotEnoughBytes,

    /// Frame longer than the maximum frame length
    TooLong,

    /// Unrecognised frame type
    InvalidFrameType,
}

/// MAC errors
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacError<E> {
    /// A frame is already queued or in flight
    Busy,

    /// Payload does not fit in a single frame
    PayloadTooLong(usize),

    /// Wrapper for unhandled / underlying radio errors
    Radio(E),
}
