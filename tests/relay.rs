use peerchat::{
    message::{encode, Message},
    relay::{pump_inbound, pump_outbound},
    session::Role,
};
use tokio::io::AsyncWriteExt;

fn message(source: &str, text: &str) -> Message {
    Message {
        source: source.to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn outbound_pump_delivers_to_inbound_pump() {
    let (local, remote) = tokio::io::duplex(1024);
    let mut displayed = Vec::new();

    tokio::join!(
        pump_outbound(&b"hello\n"[..], local, Role::Client),
        pump_inbound(remote, &mut displayed),
    );

    assert_eq!(String::from_utf8(displayed).unwrap(), "<client> hello\n");
}

#[tokio::test]
async fn blank_input_lines_are_not_sent() {
    let (local, remote) = tokio::io::duplex(1024);
    let mut displayed = Vec::new();

    tokio::join!(
        pump_outbound(&b"\n   \nhello\n"[..], local, Role::Client),
        pump_inbound(remote, &mut displayed),
    );

    assert_eq!(String::from_utf8(displayed).unwrap(), "<client> hello\n");
}

#[tokio::test]
async fn blank_frames_are_skipped_not_fatal() {
    let (mut local, remote) = tokio::io::duplex(1024);
    let mut displayed = Vec::new();

    let writer = async {
        // A bare delimiter is not a message; the pump must keep waiting.
        local.write_all(b"\n").await.expect("write blank frame");
        let frame = encode(&message("server", "still here\n")).expect("encode");
        local.write_all(&frame).await.expect("write frame");
        local.shutdown().await.expect("close");
    };

    tokio::join!(writer, pump_inbound(remote, &mut displayed));

    assert_eq!(String::from_utf8(displayed).unwrap(), "<server> still here\n");
}

#[tokio::test]
async fn messages_in_separate_writes_stay_intact() {
    let (mut local, remote) = tokio::io::duplex(1024);
    let mut displayed = Vec::new();

    let writer = async {
        for text in ["one\n", "two\n"] {
            let frame = encode(&message("client", text)).expect("encode");
            local.write_all(&frame).await.expect("write frame");
            local.flush().await.expect("flush");
        }
        local.shutdown().await.expect("close");
    };

    tokio::join!(writer, pump_inbound(remote, &mut displayed));

    assert_eq!(
        String::from_utf8(displayed).unwrap(),
        "<client> one\n<client> two\n"
    );
}

#[tokio::test]
async fn oversized_inbound_frame_fails_closed() {
    let (mut local, remote) = tokio::io::duplex(8192);
    let mut displayed = Vec::new();

    let writer = async {
        let mut oversized = vec![b'x'; 1500];
        oversized.push(b'\n');
        local.write_all(&oversized).await.expect("write oversized");
        // Nothing after the oversized frame may be displayed either.
        let frame = encode(&message("server", "late\n")).expect("encode");
        let _ = local.write_all(&frame).await;
        let _ = local.shutdown().await;
    };

    tokio::join!(writer, pump_inbound(remote, &mut displayed));

    assert!(displayed.is_empty(), "oversized frames must not be rendered");
}

#[tokio::test]
async fn undecodable_frame_closes_the_session() {
    let (mut local, remote) = tokio::io::duplex(1024);
    let mut displayed = Vec::new();

    let writer = async {
        local
            .write_all(b"this is not a frame\n")
            .await
            .expect("write garbage");
        let _ = local.shutdown().await;
    };

    tokio::join!(writer, pump_inbound(remote, &mut displayed));

    assert!(displayed.is_empty());
}

#[tokio::test]
async fn peer_disconnect_ends_the_inbound_pump() {
    let (mut local, remote) = tokio::io::duplex(1024);
    let mut displayed = Vec::new();

    let writer = async {
        let frame = encode(&message("client", "bye\n")).expect("encode");
        local.write_all(&frame).await.expect("write frame");
        drop(local);
    };

    // The pump renders what arrived and then observes the closed stream.
    tokio::join!(writer, pump_inbound(remote, &mut displayed));

    assert_eq!(String::from_utf8(displayed).unwrap(), "<client> bye\n");
}

#[tokio::test]
async fn both_directions_run_concurrently_over_one_stream() {
    let (client_end, server_end) = tokio::io::duplex(1024);
    let (client_read, client_write) = tokio::io::split(client_end);
    let (server_read, server_write) = tokio::io::split(server_end);

    let mut client_saw = Vec::new();
    let mut server_saw = Vec::new();

    tokio::join!(
        pump_outbound(&b"hello\n"[..], client_write, Role::Client),
        pump_inbound(client_read, &mut client_saw),
        pump_outbound(&b"hi\n"[..], server_write, Role::Server),
        pump_inbound(server_read, &mut server_saw),
    );

    assert_eq!(String::from_utf8(server_saw).unwrap(), "<client> hello\n");
    assert_eq!(String::from_utf8(client_saw).unwrap(), "<server> hi\n");
}
