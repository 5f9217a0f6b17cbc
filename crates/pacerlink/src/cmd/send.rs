use std::thread;
use std::time::{Duration, Instant};

use pacerlink_channel::{ChannelHandle, LinkStatsSnapshot};
use pacerlink_frame::Message;

use crate::cmd::{close_host, open_host, parse_duration, resolve_payload, SendArgs};
use crate::exit::{
    channel_error, frame_error, CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT,
    TRANSPORT_ERROR,
};
use crate::output::OutputFormat;

const DRAIN_POLL: Duration = Duration::from_millis(5);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = resolve_payload(&args.payload)?;
    let message =
        Message::new(args.kind, payload).map_err(|err| frame_error("invalid payload", err))?;

    let manager = open_host(&args.port)?;
    let handle = manager
        .handle()
        .map_err(|err| channel_error("send failed", err))?;
    let outcome = handle
        .enqueue(message)
        .map_err(|err| channel_error("send failed", err))
        .and_then(|()| wait_for_drain(&handle, timeout));

    close_host(manager, Some(format).filter(|_| outcome.is_ok()))?;
    outcome
}

/// Wait until the send worker has written, dropped or failed the message.
fn wait_for_drain(handle: &ChannelHandle, timeout: Duration) -> CliResult<i32> {
    wait_until(timeout, || settled(handle.stats()))
}

fn settled(stats: LinkStatsSnapshot) -> Option<CliResult<i32>> {
    if stats.tx_frames > 0 {
        Some(Ok(SUCCESS))
    } else if stats.tx_dropped > 0 {
        Some(Err(CliError::new(DATA_INVALID, "message rejected by encoder")))
    } else if stats.tx_errors > 0 {
        Some(Err(CliError::new(TRANSPORT_ERROR, "write to device failed")))
    } else {
        None
    }
}

fn wait_until<F>(timeout: Duration, mut check: F) -> CliResult<i32>
where
    F: FnMut() -> Option<CliResult<i32>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(result) = check() {
            return result;
        }
        if Instant::now() >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                format!("message not sent within {timeout:?}"),
            ));
        }
        thread::sleep(DRAIN_POLL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_prefers_success() {
        let stats = LinkStatsSnapshot {
            tx_frames: 1,
            ..LinkStatsSnapshot::default()
        };
        assert_eq!(settled(stats).unwrap().unwrap(), SUCCESS);
        assert!(settled(LinkStatsSnapshot::default()).is_none());
    }

    #[test]
    fn settled_reports_failures() {
        let dropped = LinkStatsSnapshot {
            tx_dropped: 1,
            ..LinkStatsSnapshot::default()
        };
        assert_eq!(settled(dropped).unwrap().unwrap_err().code, DATA_INVALID);

        let failed = LinkStatsSnapshot {
            tx_errors: 1,
            ..LinkStatsSnapshot::default()
        };
        assert_eq!(settled(failed).unwrap().unwrap_err().code, TRANSPORT_ERROR);
    }

    #[test]
    fn wait_until_times_out() {
        let err = wait_until(Duration::from_millis(20), || None).unwrap_err();
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn wait_until_polls_until_ready() {
        let mut calls = 0;
        let code = wait_until(Duration::from_secs(1), || {
            calls += 1;
            (calls == 3).then_some(Ok(SUCCESS))
        })
        .unwrap();
        assert_eq!(code, SUCCESS);
        assert_eq!(calls, 3);
    }
}
