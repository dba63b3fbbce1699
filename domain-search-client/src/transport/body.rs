//! Response body adapter.
//!
//! This module provides [`FrameStream`], which exposes any
//! [`http_body::Body`] as a [`Stream`] of frames so data chunks and HTTP
//! trailers reach the session in arrival order.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use http_body::{Body, Frame};
use pin_project_lite::pin_project;

use crate::ClientError;

pin_project! {
    /// A response body viewed as a stream of frames.
    ///
    /// Body errors surface as [`ClientError::Transport`] and end the stream.
    pub struct FrameStream<B> {
        #[pin]
        body: B,
        done: bool,
    }
}

impl<B> FrameStream<B> {
    pub fn new(body: B) -> Self {
        Self { body, done: false }
    }
}

impl<B> Stream for FrameStream<B>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    type Item = Result<Frame<Bytes>, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        match this.body.poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => Poll::Ready(Some(Ok(frame))),
            Poll::Ready(Some(Err(e))) => {
                *this.done = true;
                Poll::Ready(Some(Err(ClientError::Transport(format!(
                    "stream error: {}",
                    e
                )))))
            }
            Poll::Ready(None) => {
                *this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<B> std::fmt::Debug for FrameStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use http_body_util::{Full, StreamBody};

    #[tokio::test]
    async fn test_full_body() {
        let mut stream = FrameStream::new(Full::new(Bytes::from("hello world")));

        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from("hello world"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_data_then_trailers() {
        let mut trailers = http::HeaderMap::new();
        trailers.insert("grpc-status", http::HeaderValue::from_static("0"));
        let frames: Vec<Result<Frame<Bytes>, std::io::Error>> = vec![
            Ok(Frame::data(Bytes::from("chunk1"))),
            Ok(Frame::data(Bytes::from("chunk2"))),
            Ok(Frame::trailers(trailers)),
        ];
        let stream = FrameStream::new(StreamBody::new(futures::stream::iter(frames)));

        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 3);
        assert!(collected[0].as_ref().unwrap().is_data());
        assert!(collected[2].as_ref().unwrap().is_trailers());
    }

    #[tokio::test]
    async fn test_body_error_ends_stream() {
        let frames: Vec<Result<Frame<Bytes>, std::io::Error>> = vec![
            Ok(Frame::data(Bytes::from("chunk1"))),
            Err(std::io::Error::other("reset")),
            Ok(Frame::data(Bytes::from("never"))),
        ];
        let mut stream = FrameStream::new(StreamBody::new(futures::stream::iter(frames)));

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.message(), "stream error: reset");
        assert!(stream.next().await.is_none());
    }
}
