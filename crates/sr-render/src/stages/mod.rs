//! The four export stages, in run order.

mod concat;
mod mix;
mod normalize;
mod package;

pub use concat::ConcatStage;
pub use mix::MixStage;
pub use normalize::NormalizeStage;
pub use package::PackageStage;

use crate::stage::Stage;

/// Normalize, concat, mix, package.
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(NormalizeStage),
        Box::new(ConcatStage),
        Box::new(MixStage),
        Box::new(PackageStage),
    ]
}
