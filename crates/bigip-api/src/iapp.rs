// iApp LX package-management task endpoints

use tracing::debug;

use crate::error::Error;
use crate::models::{PackageOperation, PackageTask};
use crate::session::Session;

pub const PACKAGE_TASKS_PATH: &str = "/mgmt/shared/iapp/package-management-tasks";

impl Session {
    /// Submit an install/uninstall task and return the created task.
    ///
    /// `POST /mgmt/shared/iapp/package-management-tasks`
    pub async fn create_package_task(
        &self,
        operation: &PackageOperation,
    ) -> Result<PackageTask, Error> {
        debug!(?operation, "creating package-management task");
        self.post(PACKAGE_TASKS_PATH, operation).await
    }

    /// Read a package-management task by id.
    ///
    /// `GET /mgmt/shared/iapp/package-management-tasks/{id}`
    pub async fn package_task(&self, id: &str) -> Result<PackageTask, Error> {
        self.get(&format!("{PACKAGE_TASKS_PATH}/{id}")).await
    }
}
