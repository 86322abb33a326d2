mod embedder;
mod openai_chat_client;

pub use embedder::{
    EmbedderFactory, EmbedderFactoryError, LazyEmbedder, LocalCandleEmbedder, OpenAiEmbedder,
};
pub use openai_chat_client::OpenAiChatClient;
