//! Response capture.
//!
//! - [`writer`]: [`CapturingWriter`], a pass-through sink that keeps a copy
//!   of the body and the last status code.
//! - [`stream`]: [`reconstruct_stream`], which collapses an SSE
//!   chat-completion stream into one non-streaming completion.

pub mod stream;
pub mod writer;

pub use stream::{is_event_stream, reconstruct_stream};
pub use writer::{CapturingWriter, FlushSink, ResponseSink};
