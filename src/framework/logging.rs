use tracing_subscriber::{
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use tracing::{instrument, trace};

/// `RUST_LOG` wins over the built-in filter.
#[instrument]
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new("pikabug=info,tracing_unwrap")
            .expect("hard-coded env filter should be valid")
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    trace!("finished");
}
