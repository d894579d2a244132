use std::sync::Arc;

use planbook_model::{
    Conversation, ConversationDetail, ConversationId, ConversationService,
};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::{Error, check_status};

#[derive(Serialize)]
struct CreateConversation {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

/// The REST operations on conversations.
#[derive(Clone, Debug)]
pub struct RestConversations {
    client: Client,
    config: Arc<ApiConfig>,
}

impl RestConversations {
    /// Creates a new `RestConversations` with the given configuration.
    #[inline]
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a new `RestConversations` sharing an existing client.
    #[inline]
    pub fn with_client(client: Client, config: ApiConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    #[inline]
    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.config.url(path));
        self.config.authorize(builder)
    }
}

async fn fetch<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, Error> {
    let resp = req.send().await.map_err(Error::from_reqwest)?;
    let resp = check_status(resp).await?;
    resp.json().await.map_err(Error::from_reqwest)
}

impl ConversationService for RestConversations {
    type Error = Error;

    fn create(
        &self,
        name: Option<&str>,
    ) -> impl Future<Output = Result<Conversation, Self::Error>> + Send + 'static
    {
        let body = CreateConversation {
            name: name.map(str::to_owned),
        };
        fetch(self.request(reqwest::Method::POST, "/conversations").json(&body))
    }

    fn list(
        &self,
    ) -> impl Future<Output = Result<Vec<Conversation>, Self::Error>>
    + Send
    + 'static {
        fetch(self.request(reqwest::Method::GET, "/conversations"))
    }

    fn get(
        &self,
        id: ConversationId,
    ) -> impl Future<Output = Result<ConversationDetail, Self::Error>>
    + Send
    + 'static {
        let path = format!("/conversations/{id}");
        fetch(self.request(reqwest::Method::GET, &path))
    }

    fn delete(
        &self,
        id: ConversationId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let path = format!("/conversations/{id}");
        let req = self.request(reqwest::Method::DELETE, &path);
        async move {
            let resp = req.send().await.map_err(Error::from_reqwest)?;
            check_status(resp).await?;
            Ok(())
        }
    }
}
