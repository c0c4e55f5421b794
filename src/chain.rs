use std::sync::Arc;

use tracing::info;

use crate::{
  provider::{Provider, VideoRequest},
  Error, Result,
};

/// A direct url to the video bytes, and who found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
  pub url: String,
  pub provider: &'static str,
}

/// Tries providers one after another in their declared order. The first
/// one to come up with a url wins; later providers are never asked.
#[derive(Clone)]
pub struct ResolutionChain {
  providers: Vec<Arc<dyn Provider>>,
}

impl ResolutionChain {
  pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
    Self { providers }
  }

  pub async fn resolve_first(
    &self,
    video: &VideoRequest,
  ) -> Result<ResolvedMedia> {
    for provider in &self.providers {
      let name = provider.name();
      info!(provider = name, "trying {}...", name);

      if let Some(url) = provider.resolve(video).await {
        info!(provider = name, "got video url from {}", name);
        return Ok(ResolvedMedia {
          url,
          provider: name,
        });
      }
    }

    Err(Error::NoProviderSucceeded)
  }
}
