use std::sync::Arc;

use daytrader_core::scanner::{ActiveSymbolSet, QuoteSource, StockScanner};
use daytrader_core::trading::{DailyTradeLimiter, OrderDesk};
use daytrader_market_data::{
    AlphaVantageProvider, BrokerGateway, BrokerageProvider, Clock, ConnectionSupervisor,
    FailoverFetcher, MarketDataProvider, MassiveProvider, ProviderPolicy, SerpApiProvider,
    SystemClock,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogFormat, RestProvider};

pub struct AppState {
    pub config: Config,
    pub fetcher: Arc<FailoverFetcher>,
    pub supervisor: Option<Arc<ConnectionSupervisor>>,
    pub scanner: StockScanner,
    pub order_desk: Option<OrderDesk>,
}

impl AppState {
    pub fn active_symbols(&self) -> &Arc<ActiveSymbolSet> {
        self.scanner.active_symbols()
    }
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

/// Build the provider chain and the services on top of it.
///
/// The brokerage tier is only inserted when an embedder hands over a
/// gateway; broker settings alone are not enough to talk to one.
pub fn build_state(
    config: &Config,
    gateway: Option<Box<dyn BrokerGateway>>,
) -> anyhow::Result<Arc<AppState>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();

    let supervisor = match (gateway, &config.broker) {
        (Some(gateway), Some(settings)) => {
            let supervisor = Arc::new(ConnectionSupervisor::new(settings.clone(), gateway));
            providers.push(Arc::new(BrokerageProvider::with_clock(
                Arc::clone(&supervisor),
                Arc::clone(&clock),
            )));
            tracing::info!(
                "Brokerage tier enabled at {}:{} (client id {})",
                settings.host,
                settings.port,
                settings.client_id
            );
            Some(supervisor)
        }
        (Some(_), None) => {
            anyhow::bail!("a brokerage gateway was supplied but DT_BROKER_HOST is not set");
        }
        (None, Some(settings)) => {
            tracing::warn!(
                "DT_BROKER_HOST={} is set but no gateway is linked in; running REST tiers only",
                settings.host
            );
            None
        }
        (None, None) => None,
    };

    for tier in &config.provider_order {
        match rest_provider(config, *tier) {
            Some(provider) => providers.push(provider),
            None => tracing::info!("{:?} has no API key configured; not in the chain", tier),
        }
    }

    if providers.is_empty() {
        tracing::warn!("No market data provider is configured; every fetch will be unavailable");
    }

    let fetcher = Arc::new(FailoverFetcher::with_clock(providers, Arc::clone(&clock)));
    let source: Arc<dyn QuoteSource> = Arc::clone(&fetcher) as Arc<dyn QuoteSource>;
    let active = Arc::new(ActiveSymbolSet::new(config.seed_symbols.iter().cloned()));
    let scanner = StockScanner::new(source, active);

    let order_desk = supervisor.as_ref().map(|supervisor| {
        OrderDesk::new(
            Arc::clone(supervisor),
            Arc::new(DailyTradeLimiter::new()),
            Arc::clone(&clock),
        )
    });

    Ok(Arc::new(AppState {
        config: config.clone(),
        fetcher,
        supervisor,
        scanner,
        order_desk,
    }))
}

fn rest_provider(config: &Config, tier: RestProvider) -> Option<Arc<dyn MarketDataProvider>> {
    let timeout = config.provider_timeout;
    let provider: Arc<dyn MarketDataProvider> = match tier {
        RestProvider::SerpApi => Arc::new(SerpApiProvider::with_options(
            config.serpapi_key.clone()?,
            ProviderPolicy::monthly(config.serpapi_monthly_limit).with_cooldown(config.lockout),
            timeout,
        )),
        RestProvider::AlphaVantage => Arc::new(AlphaVantageProvider::with_options(
            config.alphavantage_key.clone()?,
            ProviderPolicy::daily(config.alphavantage_daily_limit).with_cooldown(config.lockout),
            timeout,
        )),
        RestProvider::Massive => Arc::new(MassiveProvider::with_options(
            config.massive_key.clone()?,
            config.massive_base_url.clone(),
            ProviderPolicy::per_minute(config.massive_per_minute).with_cooldown(config.lockout),
            timeout,
        )),
    };
    Some(provider)
}
