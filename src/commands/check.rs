use crate::api::{Inference, Ledger};
use crate::commands::Out;
use crate::Result;
use tracing::{error, info};

/// Checks that the web app answers and that the inference server has the configured model.
///
/// Both backends are always checked so that a single run reports everything that is wrong.
///
/// # Errors
/// Returns the web app's error if it failed, otherwise the inference server's error.
pub async fn check(
    ledger: &mut (dyn Ledger + Send),
    inference: &mut (dyn Inference + Send),
) -> Result<Out<()>> {
    let webapp = ledger.ping().await;
    match &webapp {
        Ok(()) => info!("The web app is reachable"),
        Err(e) => error!("The web app check failed: {e}"),
    }

    let model = inference.check_model().await;
    match &model {
        Ok(()) => info!("The inference server has the model '{}'", inference.model()),
        Err(e) => error!("The inference server check failed: {e}"),
    }

    webapp.map_err(|e| e.context("The web app is not available"))?;
    model.map_err(|e| {
        e.context(format!(
            "The model '{}' is not available",
            inference.model()
        ))
    })?;
    Ok(format!(
        "The web app is reachable and the model '{}' is ready",
        inference.model()
    )
    .into())
}
