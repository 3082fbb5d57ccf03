//! Telephony side of the relay: media-stream frames and call-setup TwiML.

mod messages;
mod twiml;

pub use messages::{
    MarkLabel, MediaFrame, OutboundMedia, StreamStart, TelephonyCommand, TelephonyEvent,
};
pub use twiml::{TwimlVerb, host_without_port, media_stream_url, render_twiml, xml_escape};
