//! Application state.

use std::sync::Arc;

use eyehear_describer::DescriberClient;
use eyehear_firestore::{DescriptionRepository, FirestoreClient};
use eyehear_speech::SpeechClient;
use eyehear_storage::StorageClient;

use crate::config::ApiConfig;
use crate::pipeline::{ArtifactStore, Pipeline};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<StorageClient>,
    pub firestore: Arc<FirestoreClient>,
    pub repo: Arc<DescriptionRepository>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create new application state, wiring the pipeline to the real
    /// describer, speech, and storage backends.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = Arc::new(StorageClient::from_env().await?);
        let firestore = Arc::new(FirestoreClient::from_env().await?);
        let repo = Arc::new(DescriptionRepository::new(
            (*firestore).clone(),
            config.pipeline.collection.clone(),
        ));

        let describer = Arc::new(DescriberClient::from_env()?);
        let speech = Arc::new(SpeechClient::from_env()?);
        let store = Arc::new(ArtifactStore::new(
            Arc::clone(&storage),
            Arc::clone(&repo),
        ));

        let pipeline = Arc::new(Pipeline::new(
            describer,
            speech,
            store,
            config.pipeline.caller.clone(),
        ));

        Ok(Self {
            config,
            storage,
            firestore,
            repo,
            pipeline,
        })
    }
}
