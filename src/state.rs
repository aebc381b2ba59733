use std::sync::Arc;

use minio_storage::ObjectStoreAdapter;

/// Shared handler state / 共享状态
pub struct AppState {
    pub adapter: Arc<ObjectStoreAdapter>,
}
