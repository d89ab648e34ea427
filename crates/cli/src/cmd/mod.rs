mod build;
mod check;
mod consolidate;
mod info;
mod plan;

pub use build::{BuildArgs, cmd_build};
pub use check::{CheckArgs, cmd_check};
pub use consolidate::{ConsolidateArgs, cmd_consolidate};
pub use info::cmd_info;
pub use plan::{PlanArgs, cmd_plan};

use anyhow::{Context, Result};
use pyport_lib::platform::PlatformKey;

/// The requested platform, or the host's.
fn target_platform(requested: Option<PlatformKey>) -> Result<PlatformKey> {
  match requested {
    Some(platform) => Ok(platform),
    None => PlatformKey::current().context("Failed to detect host platform; pass --platform"),
  }
}
