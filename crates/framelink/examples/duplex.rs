//! Two channels on loopback exchanging messages in both directions.
//!
//! Run with:
//!   cargo run --example duplex

use std::sync::mpsc;
use std::time::Duration;

use framelink::channel::Channel;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ch1 = Channel::new("127.0.0.1:0".parse()?);
    let ch2 = Channel::new("127.0.0.1:0".parse()?);

    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();
    ch1.on_data_received(move |payload| {
        let _ = tx.send(("ch1", payload));
    });
    ch2.on_data_received(move |payload| {
        let _ = tx2.send(("ch2", payload));
    });

    ch1.start_accepting()?;
    let addr2 = ch2.start_accepting()?;

    // One outbound connect gives both sides a full-duplex link.
    ch1.connect(addr2)?;

    ch1.send(b"123456");
    ch2.send(b"abcdefgh");

    for _ in 0..2 {
        let (side, payload) = rx.recv_timeout(Duration::from_secs(5))?;
        eprintln!(
            "{side} received {} bytes: {:?}",
            payload.len(),
            String::from_utf8_lossy(&payload)
        );
    }

    ch1.close();
    ch2.close();
    Ok(())
}
