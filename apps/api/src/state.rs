use std::sync::Arc;

use linkletter_application::{
    HostAuthGateway, MagicLinkService, OptInChannelService, SubscriptionService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub magic_link_service: MagicLinkService,
    pub subscription_service: SubscriptionService,
    pub opt_in_channel_service: OptInChannelService,
    pub auth_gateway: Arc<dyn HostAuthGateway>,
}
