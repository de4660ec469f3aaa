use crate::config::AppConfig;
use crate::services::voice::VoiceProvider;
use crate::store::TableStore;

pub struct AppState {
    pub store: Box<dyn TableStore>,
    pub voice: Box<dyn VoiceProvider>,
    pub config: AppConfig,
}
