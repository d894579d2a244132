use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use planbook_model::ByteStream;
use reqwest::Response;

use crate::Error;

type NextChunk = (Result<Option<Bytes>, reqwest::Error>, Response);

/// The streamed body of an exchange response.
pub struct ResponseBody {
    next_chunk_fut: Option<BoxFuture<'static, NextChunk>>,
}

impl ResponseBody {
    #[inline]
    pub(crate) fn from_response(resp: Response) -> Self {
        Self {
            next_chunk_fut: Some(Box::pin(next_chunk(resp))),
        }
    }
}

async fn next_chunk(mut resp: Response) -> NextChunk {
    let chunk = resp.chunk().await;
    (chunk, resp)
}

impl ByteStream for ResponseBody {
    type Error = Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>> {
        let this = self.get_mut();
        let Some(fut) = this.next_chunk_fut.as_mut() else {
            return Poll::Ready(Ok(None));
        };

        let (chunk, resp) = ready!(fut.as_mut().poll(cx));
        this.next_chunk_fut = None;
        match chunk {
            Ok(Some(bytes)) => {
                this.next_chunk_fut = Some(Box::pin(next_chunk(resp)));
                Poll::Ready(Ok(Some(bytes)))
            }
            Ok(None) => Poll::Ready(Ok(None)),
            Err(err) => {
                warn!("failed to read response body: {err}");
                Poll::Ready(Err(Error::from_reqwest(err)))
            }
        }
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody")
            .field("finished", &self.next_chunk_fut.is_none())
            .finish()
    }
}
