use std::sync::Arc;

use rotation::RotationService;
use storage::Storage;

use crate::host::{PlaybackFlag, PropertyBoard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: Arc<RotationService>,
    pub(crate) storage: Storage,
    pub(crate) board: Arc<PropertyBoard>,
    pub(crate) playback: Arc<PlaybackFlag>,
}
