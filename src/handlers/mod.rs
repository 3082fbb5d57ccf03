pub mod api;
pub mod call;
pub mod media_stream;
