//! Process-wide TLS setup.
//!
//! reqwest, kube and surrealdb together enable both rustls backends, so
//! rustls cannot pick one on its own and panics on first use.

use std::sync::Once;

use tracing::debug;

static INSTALL: Once = Once::new();

/// Install aws-lc-rs as the process-level rustls provider.
///
/// Safe to call repeatedly. If another provider is already installed it
/// is left in place.
pub fn install_crypto_provider() {
    INSTALL.call_once(|| {
        if rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }
    });
}
