//! Live updates for emergency blood requests, delivered as server-sent events.
//!
//! The backend streams `GET /emergency/{id}/updates` as `text/event-stream`, one JSON object per
//! event. [`SseDecoder`] is transport-agnostic and can be fed arbitrary byte chunks;
//! [`EmergencyUpdates`] drives it from a live reqwest response.

// std
#[cfg(feature = "reqwest")] use std::collections::VecDeque;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")]
use crate::{
	client::AuthenticatedClient,
	error::TransportError,
	http::{ApiRequest, ApiResponse, ReqwestTransport, encode_path_segment},
};

/// Event published while an emergency request is open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmergencyEvent {
	/// A donor accepted the request.
	#[serde(rename_all = "camelCase")]
	DonorResponse {
		/// Display name of the responding donor.
		donor_name: String,
		/// Contact phone number of the responding donor.
		phone: String,
	},
	/// Enough donors responded; the stream ends shortly after.
	RequestFulfilled,
	/// Event type this client does not understand; skipped by [`EmergencyUpdates`].
	#[serde(other)]
	Unknown,
}
impl EmergencyEvent {
	/// Decodes an event from a frame's `data` payload.
	pub fn from_frame(frame: &SseFrame) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_str(&frame.data);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: None })
	}
}

/// One dispatched server-sent event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseFrame {
	/// Value of the last `event:` field, if any.
	pub event: Option<String>,
	/// Value of the last `id:` field, if any.
	pub id: Option<String>,
	/// `data:` lines joined with `\n`.
	pub data: String,
}

/// Incremental `text/event-stream` decoder.
///
/// Lines may end in `\n`, `\r\n`, or a lone `\r`, and a terminator may be split across chunks.
/// A line longer than [`SseDecoder::MAX_LINE_BYTES`] is discarded up to its terminator, so a peer
/// that never ends a line cannot grow the buffer without bound.
#[derive(Debug, Default)]
pub struct SseDecoder {
	pending: Vec<u8>,
	after_cr: bool,
	oversized: bool,
	event: Option<String>,
	id: Option<String>,
	data: Vec<String>,
}
impl SseDecoder {
	/// Longest line, in bytes, the decoder buffers.
	pub const MAX_LINE_BYTES: usize = 64 * 1024;

	/// Feeds a chunk and returns every frame it completed.
	pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
		let mut frames = Vec::new();

		for &byte in chunk {
			if std::mem::take(&mut self.after_cr) && byte == b'\n' {
				continue;
			}

			match byte {
				b'\r' | b'\n' => {
					self.after_cr = byte == b'\r';

					let raw = std::mem::take(&mut self.pending);

					if std::mem::take(&mut self.oversized) {
						continue;
					}

					let line = String::from_utf8_lossy(&raw);

					if let Some(frame) = self.process_line(&line) {
						frames.push(frame);
					}
				},
				_ if self.oversized => {},
				_ if self.pending.len() >= Self::MAX_LINE_BYTES => {
					self.pending.clear();
					self.oversized = true;
				},
				_ => self.pending.push(byte),
			}
		}

		frames
	}

	fn process_line(&mut self, line: &str) -> Option<SseFrame> {
		if line.is_empty() {
			return self.dispatch();
		}
		if line.starts_with(':') {
			return None;
		}

		let (field, value) = match line.split_once(':') {
			Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
			None => (line, ""),
		};

		match field {
			"data" => self.data.push(value.to_owned()),
			"event" => self.event = Some(value.to_owned()),
			"id" => self.id = Some(value.to_owned()),
			_ => {},
		}

		None
	}

	fn dispatch(&mut self) -> Option<SseFrame> {
		let event = self.event.take();

		if self.data.is_empty() {
			return None;
		}

		let data = std::mem::take(&mut self.data).join("\n");

		Some(SseFrame { event, id: self.id.clone(), data })
	}
}

/// Live emergency update stream.
#[cfg(feature = "reqwest")]
pub struct EmergencyUpdates {
	response: reqwest::Response,
	decoder: SseDecoder,
	queue: VecDeque<SseFrame>,
}
#[cfg(feature = "reqwest")]
impl EmergencyUpdates {
	/// Returns the next understood event, or `None` once the server closes the stream.
	pub async fn next_event(&mut self) -> Result<Option<EmergencyEvent>> {
		loop {
			while let Some(frame) = self.queue.pop_front() {
				match EmergencyEvent::from_frame(&frame)? {
					EmergencyEvent::Unknown => continue,
					event => return Ok(Some(event)),
				}
			}

			match self.response.chunk().await.map_err(TransportError::from)? {
				Some(chunk) => self.queue.extend(self.decoder.push(&chunk)),
				None => return Ok(None),
			}
		}
	}
}
#[cfg(feature = "reqwest")]
impl Debug for EmergencyUpdates {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EmergencyUpdates").field("queued", &self.queue.len()).finish()
	}
}

#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestTransport> {
	/// Opens the live update stream for an emergency request.
	///
	/// The stream is opened with the same 401 handling as [`AuthenticatedClient::send`].
	pub async fn emergency_updates(&self, request_id: &str) -> Result<EmergencyUpdates> {
		const UNAUTHORIZED: u16 = 401;

		let request = updates_request(request_id)?;
		let sent = self.access_token().await?;
		let response = self.open_stream(&request, sent.as_ref()).await?;

		if response.status().as_u16() != UNAUTHORIZED {
			return self.updates_from(&request, response).await;
		}

		let failure = self.failure(&request, &buffer(response).await?);

		self.recover(&request, sent, failure).await?;

		let token = self.access_token().await?;
		let response = self.open_stream(&request, token.as_ref()).await?;

		if response.status().as_u16() == UNAUTHORIZED {
			return Err(Error::AuthenticationExpired {
				failure: self.failure(&request, &buffer(response).await?),
				session_cleared: false,
			});
		}

		self.updates_from(&request, response).await
	}

	async fn open_stream(
		&self,
		request: &ApiRequest,
		token: Option<&crate::auth::TokenSecret>,
	) -> Result<reqwest::Response> {
		let prepared = self.prepare(request, token, None)?;

		Ok(self.transport.build(prepared).send().await.map_err(TransportError::from)?)
	}

	async fn updates_from(
		&self,
		request: &ApiRequest,
		response: reqwest::Response,
	) -> Result<EmergencyUpdates> {
		if response.status().as_u16() >= 400 {
			return Err(Error::Api(self.failure(request, &buffer(response).await?)));
		}

		Ok(EmergencyUpdates { response, decoder: SseDecoder::default(), queue: VecDeque::new() })
	}
}

/// Builds the update-stream request for `request_id`, escaped as a single path segment.
#[cfg(feature = "reqwest")]
fn updates_request(request_id: &str) -> Result<ApiRequest> {
	let segment = encode_path_segment(request_id)?;

	Ok(ApiRequest::get(format!("/emergency/{segment}/updates"))
		.with_header("accept", "text/event-stream"))
}

#[cfg(feature = "reqwest")]
async fn buffer(response: reqwest::Response) -> Result<ApiResponse> {
	let status = response.status().as_u16();
	let headers = crate::http::collect_headers(response.headers());
	let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

	Ok(ApiResponse { status, headers, body })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn decoder_handles_split_chunks_and_crlf() {
		let mut decoder = SseDecoder::default();

		assert!(decoder.push(b"event: update\r\ndata: {\"type\":\"donor_").is_empty());

		let frames = decoder.push(
			b"response\",\"donorName\":\"Ada\",\"phone\":\"+33 6\"}\r\n\r\n: keep-alive\n\n",
		);

		assert_eq!(frames.len(), 1);
		assert_eq!(frames[0].event.as_deref(), Some("update"));
		assert_eq!(
			EmergencyEvent::from_frame(&frames[0]).expect("Donor response should decode."),
			EmergencyEvent::DonorResponse { donor_name: "Ada".into(), phone: "+33 6".into() }
		);
	}

	#[test]
	fn decoder_joins_multiline_data_and_keeps_last_id() {
		let mut decoder = SseDecoder::default();
		let frames = decoder.push(b"id: 7\ndata: first\ndata:second\n\ndata: third\n\n");

		assert_eq!(frames.len(), 2);
		assert_eq!(frames[0].data, "first\nsecond");
		assert_eq!(frames[0].id.as_deref(), Some("7"));
		assert_eq!(frames[1].id.as_deref(), Some("7"));
		assert!(frames[1].event.is_none());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn update_requests_keep_ids_inside_one_segment() {
		let config = crate::config::ClientConfig::builder(
			Url::parse("https://api.example.com/v1").expect("Base URL fixture should parse."),
		)
		.build()
		.expect("Default configuration should build.");
		let request = updates_request("7/../admin?x#y").expect("Hostile ids should be escaped.");
		let url = config.resolve(&request.path).expect("Escaped path should resolve.");

		assert_eq!(url.path(), "/v1/emergency/7%2F..%2Fadmin%3Fx%23y/updates");
		assert!(url.query().is_none());
		assert!(url.fragment().is_none());
		assert!(matches!(
			updates_request(".."),
			Err(Error::Config(crate::error::ConfigError::InvalidSegment { .. }))
		));
	}

	#[test]
	fn decoder_splits_on_lone_carriage_returns() {
		let mut decoder = SseDecoder::default();

		assert_eq!(decoder.push(b"data: one\r\r").len(), 1);

		// A CR ending one chunk and an LF opening the next form a single terminator.
		assert!(decoder.push(b"data: two\r").is_empty());

		let frames = decoder.push(b"\n\r\n");

		assert_eq!(frames.len(), 1);
		assert_eq!(frames[0].data, "two");
	}

	#[test]
	fn decoder_drops_oversized_lines() {
		let mut decoder = SseDecoder::default();
		let flood = vec![b'x'; SseDecoder::MAX_LINE_BYTES * 2];

		assert!(decoder.push(b"data: ").is_empty());
		assert!(decoder.push(&flood).is_empty());
		assert!(decoder.pending.len() <= SseDecoder::MAX_LINE_BYTES);

		let frames = decoder.push(b"\ndata: after\n\n");

		assert_eq!(frames.len(), 1);
		assert_eq!(frames[0].data, "after");
	}

	#[test]
	fn unknown_and_malformed_events() {
		let unknown = SseFrame { data: r#"{"type":"heartbeat"}"#.into(), ..Default::default() };

		assert_eq!(
			EmergencyEvent::from_frame(&unknown).expect("Unknown types should decode."),
			EmergencyEvent::Unknown
		);

		let fulfilled = SseFrame { data: r#"{"type":"request_fulfilled"}"#.into(), ..Default::default() };

		assert_eq!(
			EmergencyEvent::from_frame(&fulfilled).expect("Fulfilled event should decode."),
			EmergencyEvent::RequestFulfilled
		);

		let broken = SseFrame { data: "{not json".into(), ..Default::default() };

		assert!(matches!(EmergencyEvent::from_frame(&broken), Err(Error::Decode { .. })));
	}
}
