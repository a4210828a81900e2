use std::sync::Arc;

use crate::{
    application::ports::CameraCatalogPort,
    domain::{camera::CameraInfo, errors::DomainResult},
};

/// Lists the capture devices present on the host so the operator can pick
/// a preferred index before starting the stream.
#[derive(Clone)]
pub struct CameraService {
    catalog: Arc<dyn CameraCatalogPort>,
}

impl CameraService {
    pub fn new(catalog: Arc<dyn CameraCatalogPort>) -> Self {
        Self { catalog }
    }

    pub async fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>> {
        self.catalog.list_cameras().await
    }
}
