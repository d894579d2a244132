use std::sync::Arc;

use mime::Mime;
use planbook_model::{ChatTransport, ConversationId, ErrorKind};
use reqwest::{Client, header};
use serde::Serialize;

use crate::body::ResponseBody;
use crate::config::ApiConfig;
use crate::{Error, check_status};

#[derive(Serialize)]
struct SendMessage<'a> {
    content: &'a str,
}

/// Opens streamed exchanges over HTTP.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ApiConfig>,
}

impl HttpTransport {
    /// Creates a new `HttpTransport` with the given configuration.
    #[inline]
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a new `HttpTransport` sharing an existing client.
    #[inline]
    pub fn with_client(client: Client, config: ApiConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

impl ChatTransport for HttpTransport {
    type Error = Error;
    type Body = ResponseBody;

    fn open_exchange(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static
    {
        let url = self
            .config
            .url(&format!("/conversations/{conversation_id}/messages"));
        let resp_fut = self
            .config
            .authorize(self.client.post(url))
            .header(header::ACCEPT, "text/event-stream")
            .json(&SendMessage { content })
            .send();

        async move {
            let resp = resp_fut.await.map_err(Error::from_reqwest)?;
            let resp = check_status(resp).await?;

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .is_some_and(|m: Mime| {
                    m.type_() == mime::TEXT && m.subtype() == mime::EVENT_STREAM
                });
            if !is_event_stream {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::InvalidResponse,
                ));
            }

            trace!("exchange established");
            Ok(ResponseBody::from_response(resp))
        }
    }
}
