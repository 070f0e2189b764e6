/// Re-exported for callers that want to name this crate's error type without depending
/// on `epicenter-core` directly; [`SqliteMaterializer`](crate::SqliteMaterializer) itself
/// only ever raises [`epicenter_core::materializer::MaterializerError`] (§4.6, §4.7).
pub type Error = epicenter_core::materializer::MaterializerError;
