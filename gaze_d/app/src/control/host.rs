use axum::Router;
use log::info;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub struct ControlHost;

impl ControlHost {
    pub async fn start(port: u16, app_router: Router) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr).await?;
        info!("Calibration control API listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app_router).await?;
        Ok(())
    }
}
