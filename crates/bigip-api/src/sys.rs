// System endpoints

use tracing::debug;

use crate::error::Error;
use crate::models::StatsResponse;
use crate::session::Session;

pub const SYS_VERSION_PATH: &str = "/mgmt/tm/sys/version";

impl Session {
    /// Get the running TMOS version string (e.g. `13.1.1.4`).
    ///
    /// `GET /mgmt/tm/sys/version`
    pub async fn system_version(&self) -> Result<String, Error> {
        debug!("fetching system version");
        let stats: StatsResponse = self.get(SYS_VERSION_PATH).await?;
        stats
            .description("Version")
            .map(str::to_owned)
            .ok_or_else(|| Error::UnexpectedResponse("sys/version carries no Version entry".into()))
    }
}
