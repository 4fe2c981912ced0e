use std::future::Future;

use devreg_sync::{PublishedCatalog, Startup, StartupOutcome};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::router::build_router;

/// Devfile registry index server.
pub struct DevregServer {
    config: ServerConfig,
}

impl DevregServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Startup wired from this server's registry settings and index path.
    pub fn startup(&self) -> ServerResult<Startup> {
        Ok(Startup::from_config(&self.config.registry, &self.config.index_path)?)
    }

    /// Serve `published` on the configured address until Ctrl-C.
    pub async fn serve(self, published: PublishedCatalog) -> ServerResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        Self::serve_with_shutdown(listener, published, shutdown_signal()).await
    }

    pub async fn serve_with_shutdown<F>(
        listener: TcpListener,
        published: PublishedCatalog,
        signal: F,
    ) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_router(published);
        tracing::info!("devfile registry listening on {}", listener.local_addr()?);
        axum::serve(listener, app).with_graceful_shutdown(signal).await?;
        tracing::info!("server stopped");
        Ok(())
    }

    /// Full lifecycle: synchronize, then serve until `signal` resolves. The
    /// listener is not bound until startup has succeeded.
    pub async fn run_until<F>(self, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let published = match self.startup()?.run().await {
            StartupOutcome::Ready(published) => published,
            StartupOutcome::Aborted(failure) => return Err(failure.into()),
        };
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        Self::serve_with_shutdown(listener, published, signal).await
    }

    pub async fn run(self) -> ServerResult<()> {
        self.run_until(shutdown_signal()).await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    use devreg_oci::testkit::TestRegistry;
    use devreg_sync::StartupStage;
    use tokio::sync::oneshot;

    use crate::error::ServerError;

    fn free_addr() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    fn config(registry: &TestRegistry, root: &std::path::Path) -> ServerConfig {
        std::fs::create_dir_all(root.join("stacks/go")).unwrap();
        std::fs::write(root.join("stacks/go/devfile.yaml"), "schemaVersion: 2.0.0").unwrap();
        std::fs::write(root.join("index.json"), r#"[{"name": "go", "links": {"self": "go"}}]"#).unwrap();

        let mut config = ServerConfig {
            bind_addr: free_addr(),
            index_path: root.join("index.json"),
            ..ServerConfig::default()
        };
        config.registry.host = registry.host();
        config.registry.stacks_root = root.join("stacks");
        config.registry.probe_interval_ms = 10;
        config
    }

    #[test]
    fn server_construction() {
        let server = DevregServer::new(ServerConfig::default());
        assert_eq!(server.config().bind_addr.port(), 7070);
    }

    #[tokio::test]
    async fn serves_after_startup_and_shuts_down() {
        let registry = TestRegistry::start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = config(&registry, dir.path());
        let addr = config.bind_addr;

        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(DevregServer::new(config).run_until(async {
            let _ = rx.await;
        }));

        let url = format!("http://{addr}/devfiles/go");
        let body = loop {
            match reqwest::get(&url).await {
                Ok(response) => break response.bytes().await.unwrap(),
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        };
        assert_eq!(&body[..], b"schemaVersion: 2.0.0");

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn not_listening_until_every_stack_is_pushed() {
        let registry = TestRegistry::start().await.unwrap();
        registry.hold_manifests();
        let dir = tempfile::tempdir().unwrap();
        let config = config(&registry, dir.path());
        let addr = config.bind_addr;

        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(DevregServer::new(config).run_until(async {
            let _ = rx.await;
        }));

        while registry.manifest_put_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());

        registry.release_manifests();
        loop {
            if tokio::net::TcpStream::connect(addr).await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn aborted_startup_is_an_error() {
        let registry = TestRegistry::start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = config(&registry, dir.path());
        std::fs::remove_file(dir.path().join("stacks/go/devfile.yaml")).unwrap();

        let err = DevregServer::new(config).run_until(async {}).await.unwrap_err();
        assert!(matches!(err, ServerError::Startup(ref f) if f.stage == StartupStage::Publish));
    }
}
