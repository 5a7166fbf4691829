use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::mpsc;

use framelink_channel::Channel;

use crate::cmd::SendArgs;
use crate::exit::{channel_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    let channel = Channel::new(unspecified_for(args.addr));
    let (err_tx, err_rx) = mpsc::channel::<String>();
    channel.on_connection_error(move |err| {
        let _ = err_tx.send(err.to_string());
    });

    channel
        .connect(args.addr)
        .map_err(|err| channel_error("connect failed", &err))?;

    channel.send(&payload);
    // Send reports failures via the callback, inline on this thread, so any
    // fault is already queued by the time send returns.
    if let Ok(message) = err_rx.try_recv() {
        channel.close();
        return Err(CliError::new(FAILURE, format!("send failed: {message}")));
    }

    print_sent(payload.len(), format);
    channel.close();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), &err)
        });
    }
    Ok(Vec::new())
}

/// A pure sender never listens; its local identity is the unspecified
/// address in the remote's family.
fn unspecified_for(remote: SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_defaults_to_empty() {
        let args = SendArgs {
            addr: "127.0.0.1:9020".parse().unwrap(),
            data: None,
            file: None,
        };
        assert!(resolve_payload(&args).unwrap().is_empty());
    }

    #[test]
    fn data_payload_passes_through() {
        let args = SendArgs {
            addr: "127.0.0.1:9020".parse().unwrap(),
            data: Some("hello".into()),
            file: None,
        };
        assert_eq!(resolve_payload(&args).unwrap(), b"hello");
    }

    #[test]
    fn unspecified_matches_family() {
        let v4: SocketAddr = "127.0.0.1:9020".parse().unwrap();
        assert!(unspecified_for(v4).is_ipv4());
        let v6: SocketAddr = "[::1]:9020".parse().unwrap();
        assert!(unspecified_for(v6).is_ipv6());
    }
}
