use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use log::{debug, info, trace, warn};
use socket2::{SockRef, TcpKeepalive};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::pin;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::{Service, ServiceExt};

const KEEPALIVE_IDLE: Duration = Duration::from_secs(10);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(not(target_os = "windows"))]
const KEEPALIVE_RETRIES: u32 = 3;
/// Upper bound for open connections to finish after shutdown started.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// What the router sees of an accepted connection, feeds `ConnectInfo<SocketAddr>`.
#[derive(Debug, Clone, Copy)]
struct PeerConnection {
    peer: SocketAddr,
}

impl axum::extract::connect_info::Connected<PeerConnection> for SocketAddr {
    fn connect_info(target: PeerConnection) -> SocketAddr {
        target.peer
    }
}

/// Accepts connections until the token is cancelled, then waits a bounded
/// time for open connections to shut down gracefully.
pub async fn serve(listener: TcpListener, router: axum::Router<()>, cancel_token: CancellationToken) {
    let mut make_service = router.into_make_service_with_connect_info::<SocketAddr>();
    let connections = TaskTracker::new();

    loop {
        let accepted = tokio::select! {
            () = cancel_token.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((socket, peer)) => {
                set_keepalive(&socket, &peer);
                let service = connection_service(&mut make_service, peer).await;
                connections.spawn(serve_connection(socket, peer, service, cancel_token.clone()));
            }
            Err(err) => debug!("Failed to accept connection: {err}"),
        }
    }

    connections.close();
    if !connections.is_empty() {
        info!("Waiting for {} open connections", connections.len());
    }
    if tokio::time::timeout(DRAIN_TIMEOUT, connections.wait()).await.is_err() {
        warn!("{} connections still open after {}s, closing", connections.len(), DRAIN_TIMEOUT.as_secs());
    }
}

fn set_keepalive(socket: &TcpStream, peer: &SocketAddr) {
    let mut keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_IDLE)
        .with_interval(KEEPALIVE_INTERVAL);
    #[cfg(not(target_os = "windows"))]
    {
        keepalive = keepalive.with_retries(KEEPALIVE_RETRIES);
    }
    // SockRef only borrows the fd, the tokio stream stays registered
    if let Err(err) = SockRef::from(socket).set_tcp_keepalive(&keepalive) {
        debug!("Failed to set keepalive for {peer}: {err}");
    }
}

/// Router service for one connection, carrying the peer address.
async fn connection_service<M, S>(make_service: &mut M, peer: SocketAddr) -> S
where
    M: Service<PeerConnection, Error=Infallible, Response=S>,
{
    let Ok(ready) = make_service.ready().await;
    let Ok(service) = ready.call(PeerConnection { peer }).await;
    service
}

async fn serve_connection<S>(socket: TcpStream, peer: SocketAddr, service: S, cancel_token: CancellationToken)
where
    S: Service<Request, Response=Response, Error=Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    trace!("Connection opened: {peer}");
    let service = TowerToHyperService::new(service.map_request(|req: Request<Incoming>| req.map(Body::new)));
    let builder = Builder::new(TokioExecutor::new());
    let mut conn = pin!(builder.serve_connection_with_upgrades(TokioIo::new(socket), service));

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = cancel_token.cancelled() => {
            debug!("Closing connection gracefully: {peer}");
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };
    if let Err(err) = result {
        trace!("Connection {peer} failed: {err:#}");
    }
    trace!("Connection closed: {peer}");
}

#[cfg(test)]
mod tests {
    use super::serve;
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_serve_passes_peer_and_stops_on_cancel() {
        let router = axum::Router::new().route("/peer", axum::routing::get(
            |ConnectInfo(peer): ConnectInfo<SocketAddr>| async move { peer.ip().to_string() }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel_token = CancellationToken::new();
        let server = tokio::spawn(serve(listener, router, cancel_token.clone()));

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let body = client.get(format!("http://{addr}/peer")).send().await.unwrap().text().await.unwrap();
        drop(client);
        assert_eq!(body, "127.0.0.1");

        cancel_token.cancel();
        tokio::time::timeout(Duration::from_secs(15), server).await.unwrap().unwrap();
    }
}
