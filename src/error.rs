//! Errors that can occur when talking to the device sink.

//----------------------------------------------------------------------------------------------- Sink Errors
/// Error that occurs when opening or writing
/// to the audio hardware/server.
///
/// This can be due to many reasons, e.g:
/// - Audio device was unplugged
/// - Audio server disconnected/killed
/// - The requested sample rate is not supported
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
	#[error("audio stream was closed")]
	/// The audio stream was closed.
	StreamClosed,

	#[error("audio hardware/server is unavailable")]
	/// The audio hardware/server is unavailable.
	DeviceUnavailable,

	#[error("audio format is invalid or unsupported")]
	/// The audio format is invalid or unsupported.
	InvalidFormat,

	#[error("audio sample rate is invalid")]
	/// The requested sample rate was invalid.
	///
	/// This either means a `0` sample rate or one
	/// the audio hardware/server refused to open.
	InvalidSampleRate,

	#[error("unknown error: {0}")]
	/// An unknown or very specific error occurred.
	///
	/// The `str` will contain more information.
	Unknown(std::borrow::Cow<'static, str>),
}
