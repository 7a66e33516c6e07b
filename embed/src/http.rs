use reqwest::Client;
use reqwest::multipart::{Form, Part};

use crate::config::EmbedConfig;
use crate::embed::{Embedder, Embedding};
use crate::error::EmbedError;

const DEFAULT_DIM: usize = 32;

/// Embedder backed by the external ML service.
///
/// Posts the image as a multipart upload to `{base_url}/embed` and expects
/// a JSON body of `{"embedding": [...], "model_version": "..."}`.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    dim: usize,
}

impl HttpEmbedder {
    pub fn new(base_url: &str) -> Result<Self, EmbedError> {
        Self::with_config(EmbedConfig::default().with_base_url(base_url))
    }

    pub fn with_config(cfg: EmbedConfig) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: cfg.base_url,
            dim: if cfg.dimension == 0 {
                DEFAULT_DIM
            } else {
                cfg.dimension
            },
        })
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, image: &[u8]) -> Result<Embedding, EmbedError> {
        if image.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let part = Part::bytes(image.to_vec())
            .file_name("photo.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(format!("{}/embed", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let emb: Embedding = resp
            .json()
            .await
            .map_err(|e| EmbedError::Decode(e.to_string()))?;
        if emb.vector.is_empty() {
            return Err(EmbedError::Decode("empty embedding array".to_string()));
        }
        Ok(emb)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

fn classify_transport_error(e: reqwest::Error) -> EmbedError {
    if e.is_timeout() {
        EmbedError::Timeout
    } else {
        EmbedError::Unavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_image_rejected_before_any_request() {
        let embedder = HttpEmbedder::new("http://localhost:1").unwrap();
        let err = embedder.embed(&[]).await.unwrap_err();
        assert!(matches!(err, EmbedError::EmptyInput));
    }

    #[tokio::test]
    async fn unreachable_service_maps_to_unavailable() {
        // Port 1 refuses connections immediately.
        let embedder = HttpEmbedder::new("http://127.0.0.1:1").unwrap();
        let err = embedder.embed(b"jpeg-bytes").await.unwrap_err();
        assert!(matches!(
            err,
            EmbedError::Unavailable(_) | EmbedError::Timeout
        ));
    }

    #[test]
    fn response_body_shape() {
        let emb: Embedding =
            serde_json::from_str(r#"{"embedding":[0.1,0.2],"model_version":"dogfacenet-v1"}"#)
                .unwrap();
        assert_eq!(emb.vector.len(), 2);
        assert_eq!(emb.model_version, "dogfacenet-v1");
    }

    #[test]
    fn dimension_defaults() {
        let e = HttpEmbedder::new("http://x").unwrap();
        assert_eq!(e.dimension(), DEFAULT_DIM);
        let e = HttpEmbedder::with_config(EmbedConfig::default().with_dimension(128)).unwrap();
        assert_eq!(e.dimension(), 128);
    }
}
