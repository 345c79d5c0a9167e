use crate::bank::BankClient;
use crate::config::Config;
use crate::notify::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub bank: BankClient,
    pub registry: SessionRegistry,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let bank = BankClient::new(config.bank_service_url.clone(), config.request_timeout)?;
        Ok(AppState {
            bank,
            registry: SessionRegistry::new(),
        })
    }
}
