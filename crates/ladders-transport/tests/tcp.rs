//! Integration tests for the TCP line transport.
//!
//! These spin up a real listener on a loopback port chosen by the OS and
//! verify that lines flow both ways.

#[cfg(feature = "tcp")]
mod tcp {
    use std::time::Duration;

    use ladders_transport::{Connection, TcpLineTransport, Transport, TransportError, dial};

    async fn bound() -> (TcpLineTransport, String) {
        let transport = TcpLineTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    #[tokio::test]
    async fn test_accept_and_exchange_lines() {
        let (mut transport, addr) = bound().await;

        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });
        let mut client = dial(&addr).await.expect("should dial");
        let mut server = server_handle.await.expect("task should complete");

        assert!(server.id().into_inner() > 0);

        client.send(b"Ann\n").await.unwrap();
        assert_eq!(server.recv_line().await.unwrap().as_deref(), Some("Ann"));

        server.send(b"START\n").await.unwrap();
        assert_eq!(client.recv_line().await.unwrap().as_deref(), Some("START"));
    }

    #[tokio::test]
    async fn test_accepted_ids_are_sequential_per_transport() {
        let (mut transport, addr) = bound().await;

        let accept = tokio::spawn(async move {
            let a = transport.accept().await.unwrap();
            let b = transport.accept().await.unwrap();
            (a.id().into_inner(), b.id().into_inner())
        });
        let _c1 = dial(&addr).await.unwrap();
        let _c2 = dial(&addr).await.unwrap();

        let (a, b) = accept.await.unwrap();
        assert_eq!(b, a + 1);
    }

    #[tokio::test]
    async fn test_try_recv_sees_line_after_it_arrives() {
        let (mut transport, addr) = bound().await;

        let server_handle = tokio::spawn(async move { transport.accept().await.unwrap() });
        let client = dial(&addr).await.unwrap();
        let mut server = server_handle.await.unwrap();

        assert!(matches!(server.try_recv_line(), Ok(None)));

        client.send(b"ROLL\n").await.unwrap();

        let mut got = None;
        for _ in 0..100 {
            if let Some(line) = server.try_recv_line().unwrap() {
                got = Some(line);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(got.as_deref(), Some("ROLL"));
    }

    #[tokio::test]
    async fn test_client_drop_is_reported_as_closed() {
        let (mut transport, addr) = bound().await;

        let server_handle = tokio::spawn(async move { transport.accept().await.unwrap() });
        let client = dial(&addr).await.unwrap();
        let mut server = server_handle.await.unwrap();
        drop(client);

        assert!(server.recv_line().await.unwrap().is_none());
        assert!(matches!(
            server.try_recv_line(),
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_dial_refused_maps_to_connect_failed() {
        let (transport, addr) = bound().await;
        drop(transport);

        let result = dial(&addr).await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }
}
