use std::time::Duration;

use lora_logger::network::PacketListener;
use lora_logger::protocol::{Header, Message, PollRequest};
use lora_logger::{Config, GatewayId};
use tokio::net::UdpSocket;
use tracing::Level;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Settings come from an optional JSON file given as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("Failed to read {}: {}", path, e);
                    return;
                }
            };
            match Config::from_json(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Invalid settings: {}", e);
                    return;
                }
            }
        }
        None => Config {
            bind_addr: "127.0.0.1:1700".parse().unwrap(),
            ..Config::default()
        },
    };

    let listener = match PacketListener::bind(&config).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to start listener: {}", e);
            return;
        }
    };
    let addr = listener.local_addr().unwrap();
    println!("Listening on {}", addr);

    // Replay a few packets a gateway would send so there is something to see
    tokio::spawn(async move {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let gateway_id: GatewayId = "AA555A0000000101".parse().unwrap();

        let poll = Message::PollRequest(PollRequest {
            header: Header { version: 2, token: 0x0001 },
            gateway_id,
        });
        socket.send_to(&poll.encode().unwrap(), addr).await.unwrap();

        let mut push = vec![0x02, 0x02, 0x00, 0x00];
        push.extend_from_slice(gateway_id.as_bytes());
        push.extend_from_slice(
            br#"{"rxpk":[{"time":"2013-03-31T16:21:17.528002Z","tmst":3512348611,"chan":2,"rfch":0,"freq":866.349812,"stat":1,"modu":"LORA","datr":"SF7BW125","codr":"4/6","rssi":-35,"lsnr":5.1,"size":32,"data":"-DS4CGaDCdG+48eJNM3Vai-zDpsR71Pn9CPA9uCON84"}]}"#,
        );
        socket.send_to(&push, addr).await.unwrap();

        // Malformed: unknown packet type
        socket.send_to(&[0x02, 0x03, 0x00, 0x63], addr).await.unwrap();
    });

    match tokio::time::timeout(Duration::from_secs(2), listener.run()).await {
        Ok(Err(e)) => eprintln!("Listener failed: {}", e),
        _ => println!("\nDone"),
    }
}
