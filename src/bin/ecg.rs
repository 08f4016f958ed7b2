//! STM32F103 Blue Pill ECG Sampler
//! =============================================================================================
//!
//! This firmware samples an AD8232 ECG front end at a fixed rate and streams the
//! raw readings to a PC over USB serial:
//! - One decimal reading per line, `-1` while an electrode is off
//! - Sampling on a high-priority interrupt executor, fixed-rate schedule
//! - Onboard LED toggled every sample as a heartbeat
//!
//! Hardware Connections:
//!   AD8232 module -> Blue Pill
//!      GND    -> GND
//!      3.3V   -> 3.3V
//!      OUTPUT -> PA0 (ADC1_IN0, see `SamplerConfig::adc_channel`)
//!      LO+    -> PB12 (pull-down)
//!      LO-    -> PB13 (pull-down)
//!
//!   USB: PA11 (D-), PA12 (D+), CDC-ACM serial
//!   Heartbeat LED: PC13 (onboard, active low)
//!
//! Startup:
//! 1. Clocks to 72 MHz (USB needs the PLL)
//! 2. USB serial up, then a fixed delay so the host can open the port
//! 3. Banner lines queued
//! 4. Front end configured, sampling task spawned at elevated priority
//! 5. Foreground idles

#![no_std]
#![no_main]

use core::future::pending;

use cortex_m_rt::entry;
use defmt::{error, info, unwrap};
use embassy_executor::{Executor, InterruptExecutor, SendSpawner, Spawner};
use embassy_stm32::adc::{self, Adc, AdcChannel, SampleTime};
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::peripherals::{self, ADC1, PA11, PA12, USB};
use embassy_stm32::time::Hertz;
use embassy_stm32::usb::{self, Driver};
use embassy_stm32::{Config, Peripherals, bind_interrupts};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::Timer;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, UsbDevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use ecg_sampler::config::MAX_ADC_CHANNEL;
use ecg_sampler::hardware::{ActiveLevel, AdcInput, EcgFrontEnd, GpioLeadOff, GpioLed};
use ecg_sampler::output::{self, ChannelSink, Line};
use ecg_sampler::schedule::{self, DisarmHandle, DisarmSignal, EmbassyAlarm};
use ecg_sampler::{ConfigError, Sampler, SamplerConfig, StartupError};

const CONFIG: SamplerConfig = SamplerConfig::DEFAULT;

// ~128 ms of samples at 250 Hz before lines start to drop.
const LINE_QUEUE_DEPTH: usize = 32;

// Written by the sampling task, drained by the USB writer.
static LINES: Channel<CriticalSectionRawMutex, Line, LINE_QUEUE_DEPTH> = Channel::new();

// Never signalled: the schedule runs for as long as the board is powered.
static DISARM: DisarmSignal = DisarmSignal::new();

static EXECUTOR_SAMPLER: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_MAIN: StaticCell<Executor> = StaticCell::new();

bind_interrupts!(struct Irqs {
    USB_LP_CAN1_RX0 => usb::InterruptHandler<peripherals::USB>;
    ADC1_2 => adc::InterruptHandler<peripherals::ADC1>;
});

type UsbDriver = Driver<'static, USB>;
type LineReceiver = Receiver<'static, CriticalSectionRawMutex, Line, LINE_QUEUE_DEPTH>;
type BoardFrontEnd = EcgFrontEnd<
    GpioLeadOff<Input<'static>>,
    GpioLeadOff<Input<'static>>,
    GpioLed<Output<'static>>,
    AdcInput<'static, ADC1>,
>;

// USART1 is unused on this board; its vector drives the sampling executor.
#[interrupt]
unsafe fn USART1() {
    unsafe { EXECUTOR_SAMPLER.on_interrupt() }
}

#[entry]
fn main() -> ! {
    let p = embassy_stm32::init(clock_config());
    info!("ECG sampler booting");

    // Above thread mode: foreground work can never delay a tick.
    interrupt::USART1.set_priority(Priority::P6);
    let sampler_spawner = EXECUTOR_SAMPLER.start(interrupt::USART1);

    let executor = EXECUTOR_MAIN.init(Executor::new());
    executor.run(|spawner| {
        unwrap!(spawner.spawn(bootstrap(spawner, sampler_spawner, p)));
    })
}

/// HSE 8 MHz -> PLL x9 -> 72 MHz SYSCLK, 48 MHz USB, 12 MHz ADC.
fn clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll = Some(Pll {
            src: PllSource::HSE,
            prediv: PllPreDiv::DIV1,
            mul: PllMul::MUL9,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV2;
        config.rcc.apb2_pre = APBPrescaler::DIV1;
    }
    config
}

/// Bootstrap Task
///
/// Brings the board up once, arms the sampling schedule, then idles. Any
/// startup failure is fatal and leaves the schedule unarmed.
#[embassy_executor::task]
async fn bootstrap(spawner: Spawner, sampler_spawner: SendSpawner, p: Peripherals) {
    if let Err(err) = start(spawner, sampler_spawner, p).await {
        halt(err);
    }

    // Nothing left to do in the foreground.
    pending::<()>().await;
}

async fn start(
    spawner: Spawner,
    sampler_spawner: SendSpawner,
    mut p: Peripherals,
) -> Result<(), StartupError> {
    CONFIG.validate()?;

    {
        // The Blue Pill has a fixed pull-up on D+; holding it low forces the
        // host to re-enumerate after a reset.
        let _dp = Output::new(&mut p.PA12, Level::Low, Speed::Low);
        Timer::after_millis(10).await;
    }
    let (usb, class) = usb_serial(p.USB, p.PA12, p.PA11);
    spawner
        .spawn(usb_task(usb))
        .map_err(|_| StartupError::Transport)?;
    spawner
        .spawn(serial_writer(class, LINES.receiver()))
        .map_err(|_| StartupError::Transport)?;

    // Give the host time to enumerate and open the port.
    Timer::after(CONFIG.startup_delay()).await;
    output::send_banner(&LINES.sender(), &CONFIG).await;

    let ecg_in = match CONFIG.adc_channel {
        0 => p.PA0.degrade_adc(),
        1 => p.PA1.degrade_adc(),
        2 => p.PA2.degrade_adc(),
        3 => p.PA3.degrade_adc(),
        4 => p.PA4.degrade_adc(),
        5 => p.PA5.degrade_adc(),
        6 => p.PA6.degrade_adc(),
        7 => p.PA7.degrade_adc(),
        8 => p.PB0.degrade_adc(),
        9 => p.PB1.degrade_adc(),
        channel => {
            return Err(ConfigError::AdcChannelOutOfRange {
                channel,
                max: MAX_ADC_CHANNEL,
            }
            .into());
        }
    };

    // Every part is configured before the sampling task exists, so the first
    // tick never sees half-initialized hardware.
    let front_end = EcgFrontEnd::new(
        GpioLeadOff::new(Input::new(p.PB12, Pull::Down)),
        GpioLeadOff::new(Input::new(p.PB13, Pull::Down)),
        GpioLed::new(Output::new(p.PC13, Level::High, Speed::Low), ActiveLevel::Low),
        AdcInput::new(Adc::new(p.ADC1), ecg_in, SampleTime::CYCLES239_5),
    );
    // End of conversion wakes the sampler through this line; the F1 driver
    // leaves it disabled.
    interrupt::ADC1_2.unpend();
    unsafe { interrupt::ADC1_2.enable() };

    sampler_spawner
        .spawn(sampler_task(front_end))
        .map_err(|_| StartupError::TimerArm)?;
    info!(
        "sampling armed: {} ms interval ({} Hz)",
        CONFIG.interval_ms,
        CONFIG.sample_rate_hz()
    );
    Ok(())
}

fn halt(err: StartupError) -> ! {
    error!("startup failed: {}", err);
    loop {
        cortex_m::asm::wfi();
    }
}

/// Sampling Task
///
/// Sole task of the interrupt executor. Owns the front end and lends it to the
/// sampler for the lifetime of the schedule.
#[embassy_executor::task]
async fn sampler_task(mut front_end: BoardFrontEnd) {
    let mut sampler = Sampler::new(&mut front_end, ChannelSink::new(LINES.sender()));
    let summary = schedule::run(
        &mut sampler,
        &mut EmbassyAlarm,
        DisarmHandle::new(&DISARM),
        CONFIG.interval(),
    )
    .await;

    info!(
        "sampler stopped: {} ticks, {} overruns, {} lines dropped",
        summary.ticks,
        summary.overruns,
        sampler.sink().dropped()
    );
}

fn usb_serial(
    usb: USB,
    dp: PA12,
    dm: PA11,
) -> (UsbDevice<'static, UsbDriver>, CdcAcmClass<'static, UsbDriver>) {
    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
    static CDC_STATE: StaticCell<State> = StaticCell::new();

    let driver = Driver::new(usb, Irqs, dp, dm);

    let mut config = embassy_usb::Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("ecg_sampler");
    config.product = Some("ECG Sampler");
    config.serial_number = Some("00000001");
    config.max_power = 100;
    config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );
    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), 64);
    (builder.build(), class)
}

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

/// Serial Writer Task
///
/// Drains the line queue into the CDC-ACM port. While no host is attached the
/// queue fills and the sampler drops lines instead of waiting.
#[embassy_executor::task]
async fn serial_writer(mut class: CdcAcmClass<'static, UsbDriver>, lines: LineReceiver) {
    loop {
        class.wait_connection().await;
        info!("serial host connected");

        loop {
            let line = lines.receive().await;
            if let Err(EndpointError::Disabled) = class.write_packet(line.as_bytes()).await {
                break;
            }
        }

        info!("serial host disconnected");
    }
}
