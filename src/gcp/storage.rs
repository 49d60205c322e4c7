//! Cloud Storage JSON API mapping.

use serde::Deserialize;
use tracing::debug;

use crate::service::{ObjectStore, ServiceFuture, StorageEntry};
use crate::sweep::SEPARATOR;

use super::{GcpClient, GcpError};

#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<ObjectResource>,
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl GcpClient {
    async fn list_object_pages(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<StorageEntry>, GcpError> {
        let url = self.storage_url(["storage", "v1", "b", bucket, "o"])?;
        let delimiter = SEPARATOR.to_string();
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(url.clone())
                .query(&[("prefix", prefix), ("delimiter", delimiter.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListObjectsResponse = self.send_json(request, "object list").await?;
            entries.extend(page.items.into_iter().map(|item| {
                // Zero-byte placeholders created by the console end with '/'.
                if item.name.ends_with(SEPARATOR) {
                    StorageEntry::directory(bucket, item.name)
                } else {
                    StorageEntry::object(bucket, item.name)
                }
            }));
            entries.extend(
                page.prefixes
                    .into_iter()
                    .map(|name| StorageEntry::directory(bucket, name)),
            );
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        debug!(bucket, prefix, count = entries.len(), "listed objects");
        Ok(entries)
    }

    async fn delete_object(&self, entry: &StorageEntry) -> Result<(), GcpError> {
        let url = self.storage_url([
            "storage",
            "v1",
            "b",
            entry.bucket.as_str(),
            "o",
            entry.name.as_str(),
        ])?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

impl ObjectStore for GcpClient {
    type Error = GcpError;

    fn list<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
    ) -> ServiceFuture<'a, Vec<StorageEntry>, Self::Error> {
        Box::pin(async move { self.list_object_pages(bucket, prefix).await })
    }

    fn delete<'a>(&'a self, entry: &'a StorageEntry) -> ServiceFuture<'a, (), Self::Error> {
        Box::pin(async move { self.delete_object(entry).await })
    }
}
