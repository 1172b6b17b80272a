pub mod loaders;
pub mod providers;
pub mod sources;
pub mod store;

pub use loaders::*;
pub use providers::*;
pub use sources::*;
pub use store::*;

use gc_types::{Dataset, GcResult};

/// Load the dataset a source describes, restricted to its series when one is set.
pub async fn load_source(source: &DataSourceConfig) -> GcResult<Dataset> {
    let provider = source.provider();
    tracing::info!(
        "Loading dataset from {} with {}",
        source.path.display(),
        provider.name()
    );

    match &source.series {
        Some(series_id) => provider.load_series(series_id).await,
        None => provider.load().await,
    }
}
