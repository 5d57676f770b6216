//! Integration tests for the WebSocket transport.
//!
//! These tests spin up a real WebSocket server and client on localhost
//! to verify that frames, liveness probes, and close frames actually
//! cross the wire.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use quizhall_transport::{
        Connection, Frame, FrameReader, FrameWriter, Transport,
        TransportError, WebSocketConnection, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds a transport on an OS-assigned port, connects one client,
    /// and returns both ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        accept_one(transport).await
    }

    async fn accept_one(
        mut transport: WebSocketTransport,
    ) -> (WebSocketConnection, ClientWs) {
        let addr = transport.local_addr().expect("should have addr");

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server = server_handle.await.expect("task should complete");
        (server, client)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut server_conn, mut client_ws) = connected_pair().await;
        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send(b"hello from server")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, Frame::Data(b"hello from client".to_vec()));

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_are_surfaced_as_data() {
        let (mut server_conn, mut client_ws) = connected_pair().await;

        client_ws
            .send(Message::Text("{\"type\":\"request_problem\"}".into()))
            .await
            .unwrap();

        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(
            received,
            Frame::Data(b"{\"type\":\"request_problem\"}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut server_conn, mut client_ws) = connected_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_split_writer_ping_reaches_client() {
        let (server_conn, mut client_ws) = connected_pair().await;
        let (_reader, mut writer) = server_conn.split();

        writer.ping().await.expect("ping should send");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(matches!(msg, Message::Ping(_)), "got {msg:?}");
    }

    #[tokio::test]
    async fn test_split_reader_surfaces_pong() {
        let (server_conn, mut client_ws) = connected_pair().await;
        let (mut reader, _writer) = server_conn.split();

        client_ws
            .send(Message::Pong(Vec::new().into()))
            .await
            .unwrap();

        let frame = reader.recv().await.unwrap().unwrap();
        assert_eq!(frame, Frame::Pong);
    }

    #[tokio::test]
    async fn test_split_halves_carry_traffic_independently() {
        let (server_conn, mut client_ws) = connected_pair().await;
        let id = server_conn.id();
        let (mut reader, mut writer) = server_conn.split();
        assert_eq!(reader.id(), id);
        assert_eq!(writer.id(), id);

        writer.send(b"one").await.unwrap();
        writer.send(b"two").await.unwrap();
        let first = client_ws.next().await.unwrap().unwrap();
        let second = client_ws.next().await.unwrap().unwrap();
        assert_eq!(first.into_data().as_ref(), b"one");
        assert_eq!(second.into_data().as_ref(), b"two");

        client_ws
            .send(Message::Binary(b"back".to_vec().into()))
            .await
            .unwrap();
        let frame = reader.recv().await.unwrap().unwrap();
        assert_eq!(frame, Frame::Data(b"back".to_vec()));
    }

    #[tokio::test]
    async fn test_split_writer_close_sends_close_frame() {
        let (server_conn, mut client_ws) = connected_pair().await;
        let (_reader, mut writer) = server_conn.split();

        writer.close().await.expect("close should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(matches!(msg, Message::Close(_)), "got {msg:?}");
    }

    #[tokio::test]
    async fn test_message_size_limit_refuses_oversized_frame() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_max_message_size(1024);
        let (server_conn, mut client_ws) = accept_one(transport).await;
        let (mut reader, _writer) = server_conn.split();

        client_ws
            .send(Message::Binary(vec![b'a'; 1024].into()))
            .await
            .unwrap();
        let frame = reader.recv().await.unwrap().unwrap();
        assert_eq!(frame, Frame::Data(vec![b'a'; 1024]));

        let _ = client_ws
            .send(Message::Binary(vec![b'b'; 64 * 1024].into()))
            .await;
        let err = reader.recv().await.unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge(_)), "got {err:?}");
    }
}
