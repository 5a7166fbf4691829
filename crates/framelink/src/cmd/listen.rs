use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use bytes::Bytes;
use framelink_channel::Channel;

use crate::cmd::ListenArgs;
use crate::exit::{channel_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_received, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let channel = Channel::new(args.addr);
    let (tx, rx) = mpsc::channel::<Bytes>();
    channel.on_data_received(move |payload| {
        let _ = tx.send(payload);
    });

    let bound = channel
        .start_accepting()
        .map_err(|err| channel_error("bind failed", &err))?;
    eprintln!("listening on {bound}");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        // Short poll so Ctrl-C is noticed between frames.
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(payload) => {
                print_received(&payload, format);
                printed = printed.saturating_add(1);
                if let Some(count) = args.count {
                    if printed >= count {
                        break;
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    channel.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
