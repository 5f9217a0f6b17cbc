//! Host and MCU channels talking over an in-memory link.
//!
//! Run with:
//!   cargo run --example loopback

use std::sync::Arc;
use std::time::Duration;

use pacerlink::channel::{ChannelConfig, ChannelManager};
use pacerlink::frame::{debug_text, Category, ImuSample, MotorDuty};
use pacerlink::transport::{MemoryTransport, Transport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host_end, mcu_end) = MemoryTransport::pair();

    let mut host = ChannelManager::new(ChannelConfig::host());
    let mut mcu = ChannelManager::new(ChannelConfig::mcu());
    host.init(Arc::new(host_end) as Arc<dyn Transport>)?;
    mcu.init(Arc::new(mcu_end) as Arc<dyn Transport>)?;
    host.start()?;
    mcu.start()?;

    let host_link = host.handle()?;
    let mcu_link = mcu.handle()?;
    let mut mcu_events = mcu_link.subscribe();

    // Host drives the motors.
    host_link.enqueue(
        MotorDuty {
            left: 450,
            right: 430,
        }
        .into_message()?,
    )?;

    if mcu_events.wait_timeout(Duration::from_secs(1)) == Some(Category::Command) {
        while let Some(message) = mcu_link.dequeue() {
            let duty = MotorDuty::from_message(&message)?;
            eprintln!("mcu: duty left={} right={}", duty.left, duty.right);
        }
    }

    // MCU answers with telemetry and a log line.
    let sample = ImuSample {
        accel: [12, -3, 16384],
        gyro: [0, 1, -1],
    };
    mcu_link.enqueue(sample.into_message()?)?;
    mcu_link.enqueue(debug_text("pid loop locked"))?;

    for _ in 0..2 {
        let Some(message) = host_link.dequeue_timeout(Duration::from_secs(1)) else {
            eprintln!("host: timed out");
            break;
        };
        match message.category() {
            Category::Telemetry => {
                let imu = ImuSample::from_message(&message)?;
                eprintln!("host: imu accel={:?} gyro={:?}", imu.accel, imu.gyro);
            }
            _ => eprintln!("host: {} {:?}", message.kind(), message.text()),
        }
    }

    host.stop()?;
    mcu.stop()?;
    eprintln!("host stats: {:?}", host_link.stats());
    host.deinit()?;
    mcu.deinit()?;
    Ok(())
}
