mod embedder_factory;
mod lazy_embedder;
mod local_candle_embedder;
mod openai_embedder;

pub use embedder_factory::{EmbedderFactory, EmbedderFactoryError};
pub use lazy_embedder::LazyEmbedder;
pub use local_candle_embedder::LocalCandleEmbedder;
pub use openai_embedder::OpenAiEmbedder;
