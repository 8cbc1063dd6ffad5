//! Transport-failure mapping shared by every hop.

// crates.io
use oauth2::HttpClientError;
// self
use crate::{
	_prelude::*,
	error::{ExchangeFailure, TransportError},
	exchange::Hop,
	http::ResponseMetadata,
};

/// Maps HTTP transport failures into [`ExchangeFailure`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a hop failure.
	fn map_transport_error(
		&self,
		hop: Hop,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> ExchangeFailure;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		hop: Hop,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> ExchangeFailure {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(hop, *inner),
			HttpClientError::Http(inner) => ExchangeFailure::invalid_request(inner),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_generic_transport_error(meta, "unclassified transport failure"),
		}
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(_hop: Hop, err: ReqwestError) -> ExchangeFailure {
	if err.is_builder() {
		flow_event!(debug, hop = %_hop, "request could not be built");

		return ExchangeFailure::invalid_request(err);
	}

	TransportError::from(err).into()
}

pub(crate) fn map_generic_transport_error(
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> ExchangeFailure {
	let message = match meta.and_then(|meta| meta.status) {
		Some(status) => format!("{message} (after HTTP {status})"),
		None => message.to_string(),
	};

	TransportError::Other { message }.into()
}
