// File transfer endpoints
//
// Chunked uploads to the device's REST downloads directory. Each chunk is
// a separate POST carrying `Content-Range: start-end/size`; the device
// reassembles them by offset.

use std::path::Path;

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::Error;
use crate::session::{Payload, Session};

pub const UPLOADS_PATH: &str = "/mgmt/shared/file-transfer/uploads";

/// Where uploaded files land on the device.
pub const REMOTE_DIRECTORY: &str = "/var/config/rest/downloads";

/// Bytes per upload request.
pub const CHUNK_SIZE: u64 = 7168 * 1024;

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// File name on the device.
    pub name: String,
    /// Absolute path on the device.
    pub remote_path: String,
    pub size: u64,
    pub chunks: usize,
}

impl Session {
    /// Upload a local file in [`CHUNK_SIZE`] slices.
    ///
    /// `dest_name` overrides the remote file name; by default the local
    /// file name is kept. An empty file produces no request.
    pub async fn upload_file(
        &self,
        local: &Path,
        dest_name: Option<&str>,
    ) -> Result<UploadedFile, Error> {
        let name = match dest_name {
            Some(name) => name.to_owned(),
            None => local
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_owned)
                .ok_or_else(|| {
                    Error::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("{} has no usable file name", local.display()),
                    ))
                })?,
        };

        let mut file = tokio::fs::File::open(local).await?;
        let size = file.metadata().await?.len();
        let url = self.url(&format!("{UPLOADS_PATH}/{name}"))?;
        debug!(file = %local.display(), size, "uploading file to {}", url);

        let mut start: u64 = 0;
        let mut chunks = 0;
        loop {
            let mut buf = Vec::new();
            let read = (&mut file).take(CHUNK_SIZE).read_to_end(&mut buf).await?;
            if read == 0 {
                break;
            }

            let end = start + buf.len() as u64;
            let payload = Payload::Octets {
                data: Bytes::from(buf),
                content_range: format!("{}-{}/{}", start, end - 1, size),
            };
            self.send(Method::POST, url.clone(), &payload).await?;

            chunks += 1;
            start = end;
        }

        debug!(chunks, "upload complete");
        Ok(UploadedFile {
            remote_path: format!("{REMOTE_DIRECTORY}/{name}"),
            name,
            size,
            chunks,
        })
    }
}
