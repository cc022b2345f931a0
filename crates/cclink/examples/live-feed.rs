//! Connect to the link service and print everything that arrives.
//!
//! Run with:
//!   cargo run --example live-feed
//!
//! Follows a broadcaster by uid when one is given:
//!   cargo run --example live-feed -- 268158652

use cclink::client::{CCLink, ClientEvent};
use cclink::codec::Message;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let client = CCLink::builder()
        .middleware(|message, next| {
            Box::pin(async move {
                println!("[{}] {:?}", message.route(), message.payload);
                next.proceed().await
            })
        })
        .build();

    let mut events = client.events();
    client.connect().await?;
    loop {
        match events.recv().await? {
            ClientEvent::Connected => break,
            other => eprintln!("while connecting: {other:?}"),
        }
    }
    eprintln!("connected");

    if let Some(uid) = std::env::args().nth(1) {
        let uid: u64 = uid.parse()?;
        let response = client
            .request(Message::new(40962, 3).with("follow_uid", uid).with("uid", uid))
            .await?;
        eprintln!("follow response: {:?}", response.payload);
    }

    // Stay on the line; the middleware above prints every inbound message.
    loop {
        match events.recv().await? {
            ClientEvent::Closed { code, reason } => {
                eprintln!("closed by remote ({code}): {reason}");
            }
            event => eprintln!("{event:?}"),
        }
    }
}
