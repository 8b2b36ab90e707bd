// Unix utility endpoints
//
// Thin wrappers over `tm/util/unix-ls` and `tm/util/unix-rm`, used by the
// package workflow to probe and clean up uploaded files.

use tracing::debug;

use crate::error::Error;
use crate::models::{CommandResponse, RunCommand};
use crate::session::Session;

pub const UNIX_LS_PATH: &str = "/mgmt/tm/util/unix-ls";
pub const UNIX_RM_PATH: &str = "/mgmt/tm/util/unix-rm";

impl Session {
    /// List a remote file or directory, returning `ls` output verbatim.
    ///
    /// A missing path is not an error here: the device reports
    /// `No such file or directory` inside `commandResult`.
    pub async fn unix_ls(&self, path: &str) -> Result<String, Error> {
        debug!(path, "listing remote path");
        let resp: CommandResponse = self.post(UNIX_LS_PATH, &RunCommand::new(path)).await?;
        resp.command_result.ok_or_else(|| {
            Error::UnexpectedResponse("Error while executing the command.".into())
        })
    }

    /// Delete a remote file.
    pub async fn unix_rm(&self, path: &str) -> Result<(), Error> {
        debug!(path, "removing remote file");
        let _: serde_json::Value = self.post(UNIX_RM_PATH, &RunCommand::new(path)).await?;
        Ok(())
    }
}
