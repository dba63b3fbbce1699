//! Streaming session for one `CheckPriceAgent` call.
//!
//! This module provides [`PriceStream`]: a stream that sends the request on
//! first poll, parses the gRPC-Web response body frame by frame, and yields
//! one decoded [`SearchPricesResponse`] per data frame.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Sending -> Streaming -> Completed
//!            |           |------> Failed
//!            |------------------> Failed
//! (any non-terminal state) -----> Cancelled
//! ```
//!
//! A stream is single-use. Once it reaches a terminal state it only yields
//! `None`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use domain_search_core::{DecodeMessage, FrameKind, FrameParser, Trailers};
use futures::future::BoxFuture;
use futures::stream::FusedStream;
use futures::Stream;
use http::HeaderMap;

use crate::ClientError;
use crate::cancel::CancellationToken;
use crate::message::SearchPricesResponse;
use crate::transport::{BodyStream, DEFAULT_CONNECT_ERROR, Transport, TransportResponse};

/// Where a [`PriceStream`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, nothing sent yet.
    Idle,
    /// Request handed to the transport, waiting for the response head.
    Sending,
    /// Reading the response body.
    Streaming,
    /// Ended with status 0.
    Completed,
    /// Ended with an error, which was yielded as the last item.
    Failed,
    /// Ended by its cancellation token.
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// Server-streaming price search.
///
/// Nothing is sent until the stream is first polled. Records come out in
/// wire order, and each data frame is only decoded when the consumer asks
/// for the next item.
///
/// Firing the [`CancellationToken`] ends the stream at its next poll (a
/// pending poll is woken): the request or body is dropped, buffered bytes
/// are discarded, and the stream ends without an error item.
pub struct PriceStream {
    state: SessionState,
    transport: Arc<dyn Transport>,
    /// The request to send, or why it could not be built.
    request: Option<Result<http::Request<Bytes>, ClientError>>,
    /// In-flight transport call while `Sending`.
    pending: Option<BoxFuture<'static, Result<TransportResponse, ClientError>>>,
    /// Response body while `Streaming`.
    body: Option<BodyStream>,
    /// Error text collected from a non-success response body.
    error_body: Option<BytesMut>,
    parser: FrameParser,
    /// Response headers, consulted when no trailer frame arrives.
    headers: HeaderMap,
    /// HTTP trailers, if the transport delivered any.
    http_trailers: HeaderMap,
    /// Terminal status metadata once the stream has completed or failed.
    trailers: Option<Trailers>,
    token: CancellationToken,
    cancelled: Pin<Box<dyn Future<Output = ()> + Send>>,
    records: usize,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl PriceStream {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        request: Result<http::Request<Bytes>, ClientError>,
        token: CancellationToken,
    ) -> Self {
        #[cfg(feature = "tracing")]
        let span = {
            let method = match &request {
                Ok(req) => req.uri().path().to_string(),
                Err(_) => String::new(),
            };
            tracing::info_span!(
                "rpc.call",
                rpc.method = %method,
                rpc.type = "server_stream",
                otel.kind = "client",
            )
        };

        Self {
            state: SessionState::Idle,
            transport,
            request: Some(request),
            pending: None,
            body: None,
            error_body: None,
            parser: FrameParser::new(),
            headers: HeaderMap::new(),
            http_trailers: HeaderMap::new(),
            trailers: None,
            cancelled: Box::pin(token.cancelled_owned()),
            token,
            records: 0,
            #[cfg(feature = "tracing")]
            span,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the stream has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Terminal status metadata: the trailer frame, or the response headers
    /// and HTTP trailers when the body ended without one.
    ///
    /// Returns `None` until the stream has completed or failed on a status.
    pub fn trailers(&self) -> Option<&Trailers> {
        self.trailers.as_ref()
    }

    /// Number of records yielded so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// The token that cancels this stream.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    fn transition(&mut self, next: SessionState) {
        #[cfg(feature = "tracing")]
        tracing::debug!(from = ?self.state, to = ?next, records = self.records, "price stream state");
        self.state = next;
    }

    /// Drop everything tied to the network.
    fn release(&mut self) {
        self.request = None;
        self.pending = None;
        self.body = None;
        self.error_body = None;
        self.parser.clear();
    }

    fn cancel_now(&mut self) {
        self.release();
        self.transition(SessionState::Cancelled);
    }

    fn fail(&mut self, error: ClientError) -> Poll<Option<Result<SearchPricesResponse, ClientError>>> {
        #[cfg(feature = "tracing")]
        tracing::debug!(error = %error, "price stream failed");
        self.release();
        self.transition(SessionState::Failed);
        Poll::Ready(Some(Err(error)))
    }

    /// Resolve the stream from terminal status metadata.
    fn finish(&mut self, trailers: Trailers) -> Poll<Option<Result<SearchPricesResponse, ClientError>>> {
        let status = trailers.grpc_status();
        let error = (status != 0).then(|| ClientError::from_status(status, trailers.grpc_message()));
        self.trailers = Some(trailers);

        match error {
            Some(error) => self.fail(error),
            None => {
                self.release();
                self.transition(SessionState::Completed);
                Poll::Ready(None)
            }
        }
    }

    /// The body ended without a trailer frame.
    fn end_of_body(&mut self) -> Poll<Option<Result<SearchPricesResponse, ClientError>>> {
        let mut fallback = Trailers::from_headers(&self.headers);
        fallback.extend(Trailers::from_headers(&self.http_trailers));

        // A partial frame left at the end is dropped.
        #[cfg(feature = "tracing")]
        {
            if !self.parser.is_empty() {
                tracing::debug!(
                    leftover = self.parser.buffered_len(),
                    "body ended inside a frame"
                );
            }
        }
        self.finish(fallback)
    }

    fn on_response(&mut self, response: TransportResponse) -> Option<ClientError> {
        let Some(body) = response.body else {
            return Some(ClientError::Transport(DEFAULT_CONNECT_ERROR.into()));
        };
        if !response.status.is_success() {
            // The body holds the error text, not frames.
            self.error_body = Some(BytesMut::new());
        }
        self.headers = response.headers;
        self.body = Some(body);
        None
    }

    /// Read a non-success response body to the end and fail with its text.
    fn poll_error_body(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<SearchPricesResponse, ClientError>>> {
        while let Some(body) = self.body.as_mut() {
            match body.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(frame))) => {
                    if let (Ok(data), Some(text)) = (frame.into_data(), self.error_body.as_mut()) {
                        text.extend_from_slice(&data);
                    }
                }
                // An unreadable error body counts as empty from here on.
                Poll::Ready(Some(Err(_))) | Poll::Ready(None) => self.body = None,
            }
        }

        let text = self
            .error_body
            .take()
            .map(|text| String::from_utf8_lossy(&text).trim().to_string())
            .unwrap_or_default();
        let message = if text.is_empty() {
            DEFAULT_CONNECT_ERROR.to_string()
        } else {
            text
        };
        self.fail(ClientError::Transport(message))
    }
}

impl Stream for PriceStream {
    type Item = Result<SearchPricesResponse, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        #[cfg(feature = "tracing")]
        let span = this.span.clone();
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        loop {
            if this.state.is_terminal() {
                return Poll::Ready(None);
            }

            // Cancellation pre-empts everything, including buffered frames.
            if this.token.is_cancelled() || this.cancelled.as_mut().poll(cx).is_ready() {
                this.cancel_now();
                return Poll::Ready(None);
            }

            match this.state {
                SessionState::Idle => match this.request.take() {
                    Some(Ok(request)) => {
                        this.pending = Some(this.transport.send(request));
                        this.transition(SessionState::Sending);
                    }
                    Some(Err(error)) => return this.fail(error),
                    None => {
                        return this.fail(ClientError::Protocol("request already sent".into()));
                    }
                },

                SessionState::Sending => {
                    let Some(pending) = this.pending.as_mut() else {
                        return this.fail(ClientError::Protocol("no request in flight".into()));
                    };
                    match pending.as_mut().poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Err(error)) => return this.fail(error),
                        Poll::Ready(Ok(response)) => {
                            this.pending = None;
                            if let Some(error) = this.on_response(response) {
                                return this.fail(error);
                            }
                            this.transition(SessionState::Streaming);
                        }
                    }
                }

                SessionState::Streaming => {
                    if this.error_body.is_some() {
                        return this.poll_error_body(cx);
                    }

                    // Hand out buffered frames before reading more.
                    if let Some(frame) = this.parser.next_frame() {
                        match frame.kind() {
                            FrameKind::Data => {
                                return match SearchPricesResponse::decode(&frame.payload) {
                                    Ok(record) => {
                                        this.records += 1;
                                        Poll::Ready(Some(Ok(record)))
                                    }
                                    Err(error) => this.fail(error.into()),
                                };
                            }
                            // Anything after the trailer frame is never looked at.
                            FrameKind::Trailer => return this.finish(Trailers::parse(&frame.payload)),
                            FrameKind::Unknown(flag) => {
                                return this.fail(ClientError::Protocol(format!(
                                    "unexpected frame flag 0x{:02x}",
                                    flag
                                )));
                            }
                        }
                    }

                    let Some(body) = this.body.as_mut() else {
                        return this.end_of_body();
                    };
                    match body.as_mut().poll_next(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
                            Ok(data) => this.parser.push(&data),
                            Err(frame) => {
                                if let Ok(trailers) = frame.into_trailers() {
                                    this.http_trailers.extend(trailers);
                                }
                            }
                        },
                        Poll::Ready(Some(Err(error))) => return this.fail(error),
                        Poll::Ready(None) => {
                            this.body = None;
                            return this.end_of_body();
                        }
                    }
                }

                SessionState::Completed | SessionState::Failed | SessionState::Cancelled => {
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl FusedStream for PriceStream {
    fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }
}

impl std::fmt::Debug for PriceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceStream")
            .field("state", &self.state)
            .field("records", &self.records)
            .field("buffered", &self.parser.buffered_len())
            .finish_non_exhaustive()
    }
}
