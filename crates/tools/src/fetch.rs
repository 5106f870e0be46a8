use streaming::{ImageLoader, LoadError, Request};
use tokio::sync::mpsc;
use tracing::debug;

pub type Completion = (Request, Result<Vec<u8>, LoadError>);

/// [`ImageLoader`] backed by reqwest. Each load runs as its own task on the
/// current runtime and reports back over a channel; `file://` URLs are read
/// from disk.
#[derive(Debug, Clone)]
pub struct HttpImageLoader {
    client: reqwest::Client,
    tx: mpsc::UnboundedSender<Completion>,
}

impl HttpImageLoader {
    pub fn new(client: reqwest::Client) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { client, tx }, rx)
    }
}

impl ImageLoader for HttpImageLoader {
    fn load(&mut self, request: Request, url: &str) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            let result = fetch(&client, &url).await;
            if tx.send((request, result)).is_err() {
                debug!(request = %request, "completion receiver dropped");
            }
        });
    }
}

pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, LoadError> {
    if let Some(path) = url.strip_prefix("file://") {
        return tokio::fs::read(path)
            .await
            .map_err(|e| LoadError::Network(format!("{path}: {e}")));
    }

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| LoadError::Network(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(LoadError::Status(resp.status().as_u16()));
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| LoadError::Network(e.to_string()))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::{HttpImageLoader, fetch};
    use streaming::{ImageLoader, LoadError, Request};

    #[tokio::test]
    async fn file_urls_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.bin");
        std::fs::write(&path, b"abc").unwrap();

        let client = reqwest::Client::new();
        let url = format!("file://{}", path.display());
        assert_eq!(fetch(&client, &url).await.unwrap(), b"abc".to_vec());

        let missing = format!("file://{}", dir.path().join("nope").display());
        assert!(matches!(fetch(&client, &missing).await, Err(LoadError::Network(_))));
    }

    #[tokio::test]
    async fn loader_reports_over_the_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.bin");
        std::fs::write(&path, b"xyz").unwrap();

        let (mut loader, mut rx) = HttpImageLoader::new(reqwest::Client::new());
        loader.load(Request::new(3, 7), &format!("file://{}", path.display()));
        let (req, result) = rx.recv().await.unwrap();
        assert_eq!(req, Request::new(3, 7));
        assert_eq!(result.unwrap(), b"xyz".to_vec());
    }
}
