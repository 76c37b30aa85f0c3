use std::sync::Arc;

use noterag_service::NoteService;

use crate::auth::{InMemoryDirectory, UserDirectory};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<NoteService>,
	pub directory: Arc<dyn UserDirectory>,
}
impl AppState {
	pub async fn new(config: noterag_config::Config) -> color_eyre::Result<Self> {
		let service = NoteService::new(config).await?;

		Ok(Self { service: Arc::new(service), directory: Arc::new(InMemoryDirectory::new()) })
	}

	pub fn with_service(
		service: Arc<NoteService>,
		directory: Arc<dyn UserDirectory>,
	) -> Self {
		Self { service, directory }
	}
}
