use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pacerlink_channel::RunStatus;
use pacerlink_frame::Direction;
use tracing::warn;

use crate::cmd::{close_host, install_ctrlc_handler, open_host, parse_duration, MonitorArgs};
use crate::exit::{channel_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_message, OutputFormat};

const DEQUEUE_SLICE: Duration = Duration::from_millis(200);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let deadline = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|duration| Instant::now() + duration);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let manager = open_host(&args.port)?;
    let handle = manager
        .handle()
        .map_err(|err| channel_error("monitor failed", err))?;

    let mut printed = 0usize;
    let mut outcome = Ok(SUCCESS);
    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
        if let Some(message) = handle.dequeue_timeout(DEQUEUE_SLICE) {
            print_message(Direction::McuToHost, &message, format);
            printed = printed.saturating_add(1);
            if args.count.is_some_and(|count| printed >= count) {
                break;
            }
            continue;
        }
        if matches!(
            handle.run_status(),
            RunStatus::ReceiveStopped | RunStatus::BothStopped
        ) && handle.is_recv_empty()
        {
            warn!("receive worker stopped");
            outcome = Err(CliError::new(TRANSPORT_ERROR, "link lost"));
            break;
        }
    }

    close_host(manager, args.stats.then_some(format))?;
    outcome
}
