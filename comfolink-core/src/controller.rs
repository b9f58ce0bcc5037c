//! Ventilation unit controller.
//!
//! Ties the protocol engine, the task scheduler, and the observer sinks
//! together the way an embedding uses them: a periodic refresh pass
//! enqueued from the host's update timer, setpoint writes enqueued as the
//! UI changes values, and a poll hook called from the host's main loop.
//!
//! Each enqueued exchange owns the serial line until it completes, so a
//! refresh pass and a setpoint write can coexist in flight without their
//! bytes interleaving. A failed exchange logs and completes; it never
//! takes the queue or the process down with it.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use comfolink_protocol::commands::{
    BYPASS_CONTROL_LEN, BYPASS_STATUS_LEN, CMD_GET_BYPASS_CONTROL, CMD_GET_BYPASS_STATUS,
    CMD_GET_FAULTS, CMD_GET_TEMPERATURES, CMD_GET_VENTILATION_LEVELS, CMD_SET_COMFORT_TEMPERATURE,
    CMD_SET_LEVEL, FAULTS_LEN, TEMPERATURES_LEN, VENTILATION_LEVELS_LEN,
};
use comfolink_protocol::values::{
    celsius_x10_to_raw, level_to_raw, BypassStatus, FaultReport, TemperatureReport,
    VentilationStatus,
};

use crate::engine::Engine;
use crate::scheduler::TaskQueue;
use crate::traits::{
    BinarySink, BypassSink, FanLevelSink, FaultSink, SerialPort, SetpointSink, TemperatureSink,
};

/// Observer sinks; every one is optional.
#[derive(Default)]
struct Sinks {
    outside_temperature: Option<Box<dyn TemperatureSink>>,
    supply_temperature: Option<Box<dyn TemperatureSink>>,
    extract_temperature: Option<Box<dyn TemperatureSink>>,
    exhaust_temperature: Option<Box<dyn TemperatureSink>>,
    bypass_status: Option<Box<dyn BypassSink>>,
    filter_full: Option<Box<dyn BinarySink>>,
    fan_level: Option<Box<dyn FanLevelSink>>,
    comfort_setpoint: Option<Box<dyn SetpointSink>>,
    faults: Option<Box<dyn FaultSink>>,
}

/// State shared between the controller and its enqueued tasks.
struct Shared<P> {
    engine: Engine<P>,
    sinks: RefCell<Sinks>,
    /// Setpoint writes still in flight. Readback publication is
    /// suppressed while non-zero so a periodic refresh cannot overwrite a
    /// value the unit has not applied yet.
    pending_setpoint_writes: Cell<u32>,
}

/// ComfoAir unit controller.
///
/// All methods are non-blocking: reads and writes are enqueued as
/// cooperative tasks and make progress whenever the host calls
/// [`Self::poll`].
pub struct ComfoAir<P> {
    shared: Rc<Shared<P>>,
    tasks: TaskQueue,
}

impl<P: SerialPort + 'static> ComfoAir<P> {
    pub fn new(port: P) -> Self {
        Self {
            shared: Rc::new(Shared {
                engine: Engine::new(port),
                sinks: RefCell::new(Sinks::default()),
                pending_setpoint_writes: Cell::new(0),
            }),
            tasks: TaskQueue::new(),
        }
    }

    pub fn set_outside_temperature_sink(&mut self, sink: impl TemperatureSink + 'static) {
        self.shared.sinks.borrow_mut().outside_temperature = Some(Box::new(sink));
    }

    pub fn set_supply_temperature_sink(&mut self, sink: impl TemperatureSink + 'static) {
        self.shared.sinks.borrow_mut().supply_temperature = Some(Box::new(sink));
    }

    pub fn set_extract_temperature_sink(&mut self, sink: impl TemperatureSink + 'static) {
        self.shared.sinks.borrow_mut().extract_temperature = Some(Box::new(sink));
    }

    pub fn set_exhaust_temperature_sink(&mut self, sink: impl TemperatureSink + 'static) {
        self.shared.sinks.borrow_mut().exhaust_temperature = Some(Box::new(sink));
    }

    pub fn set_bypass_status_sink(&mut self, sink: impl BypassSink + 'static) {
        self.shared.sinks.borrow_mut().bypass_status = Some(Box::new(sink));
    }

    pub fn set_filter_full_sink(&mut self, sink: impl BinarySink + 'static) {
        self.shared.sinks.borrow_mut().filter_full = Some(Box::new(sink));
    }

    pub fn set_fan_level_sink(&mut self, sink: impl FanLevelSink + 'static) {
        self.shared.sinks.borrow_mut().fan_level = Some(Box::new(sink));
    }

    pub fn set_comfort_setpoint_sink(&mut self, sink: impl SetpointSink + 'static) {
        self.shared.sinks.borrow_mut().comfort_setpoint = Some(Box::new(sink));
    }

    pub fn set_fault_sink(&mut self, sink: impl FaultSink + 'static) {
        self.shared.sinks.borrow_mut().faults = Some(Box::new(sink));
    }

    /// Cooperative tick; call from the host main loop.
    pub fn poll(&self) {
        self.tasks.poll();
    }

    /// Number of exchanges queued or in flight.
    pub fn backlog(&self) -> usize {
        self.tasks.len()
    }

    /// Enqueue the periodic read pass.
    ///
    /// Reads temperatures, bypass status, ventilation level, and the
    /// fault block as one sequential task.
    pub fn refresh(&self) {
        let shared = self.shared.clone();
        self.tasks.enqueue(async move {
            update_temperatures(&shared).await;
            update_bypass_status(&shared).await;
            update_ventilation_level(&shared).await;
            update_faults(&shared).await;
        });
    }

    /// Enqueue a diagnostic dump of the bypass control block.
    pub fn refresh_bypass_control(&self) {
        let shared = self.shared.clone();
        self.tasks.enqueue(async move {
            update_bypass_control(&shared).await;
        });
    }

    /// Enqueue a fan level change.
    ///
    /// The accepted range is [`MIN_LEVEL`](comfolink_protocol::values::MIN_LEVEL)
    /// to [`MAX_LEVEL`](comfolink_protocol::values::MAX_LEVEL); values are
    /// not clamped here.
    pub fn set_level(&self, level: u8) {
        let shared = self.shared.clone();
        self.tasks.enqueue(async move {
            apply_level(&shared, level).await;
        });
    }

    /// Enqueue a comfort setpoint change, tenths of a degree Celsius.
    ///
    /// Setpoint readback publication is suppressed until the write
    /// completes, so a refresh racing this task cannot revert the UI.
    pub fn set_comfort_temperature(&self, celsius_x10: i16) {
        let shared = self.shared.clone();
        shared
            .pending_setpoint_writes
            .set(shared.pending_setpoint_writes.get() + 1);
        self.tasks.enqueue(async move {
            apply_comfort_temperature(&shared, celsius_x10).await;
            shared
                .pending_setpoint_writes
                .set(shared.pending_setpoint_writes.get() - 1);
        });
    }
}

async fn update_temperatures<P: SerialPort>(shared: &Shared<P>) {
    let response = match shared
        .engine
        .query_data(CMD_GET_TEMPERATURES, TEMPERATURES_LEN)
        .await
    {
        Ok(response) => response,
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("failed to get temperatures: {}", _err);
            return;
        }
    };

    let Ok(report) = TemperatureReport::parse(&response.data) else {
        return;
    };

    let mut sinks = shared.sinks.borrow_mut();

    if shared.pending_setpoint_writes.get() == 0 {
        if let Some(sink) = sinks.comfort_setpoint.as_deref_mut() {
            if sink.current() != Some(report.comfort_x10) {
                sink.publish(report.comfort_x10);
            }
        }
    }

    if let Some(sink) = sinks.outside_temperature.as_deref_mut() {
        sink.publish(report.outside_x10);
    }
    if let Some(sink) = sinks.supply_temperature.as_deref_mut() {
        sink.publish(report.supply_x10);
    }
    if let Some(sink) = sinks.extract_temperature.as_deref_mut() {
        sink.publish(report.extract_x10);
    }
    if let Some(sink) = sinks.exhaust_temperature.as_deref_mut() {
        sink.publish(report.exhaust_x10);
    }
}

async fn update_bypass_status<P: SerialPort>(shared: &Shared<P>) {
    if shared.sinks.borrow().bypass_status.is_none() {
        return;
    }

    let response = match shared
        .engine
        .query_data(CMD_GET_BYPASS_STATUS, BYPASS_STATUS_LEN)
        .await
    {
        Ok(response) => response,
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("failed to get bypass status: {}", _err);
            return;
        }
    };

    let Ok(status) = BypassStatus::parse(&response.data) else {
        return;
    };

    // An unknown position is withheld, not published as a reading
    if let Some(percent) = status.percent {
        if let Some(sink) = shared.sinks.borrow_mut().bypass_status.as_deref_mut() {
            sink.publish(percent);
        }
    }
}

async fn update_ventilation_level<P: SerialPort>(shared: &Shared<P>) {
    if shared.sinks.borrow().fan_level.is_none() {
        return;
    }

    let response = match shared
        .engine
        .query_data(CMD_GET_VENTILATION_LEVELS, VENTILATION_LEVELS_LEN)
        .await
    {
        Ok(response) => response,
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("failed to get ventilation levels: {}", _err);
            return;
        }
    };

    let Ok(status) = VentilationStatus::parse(&response.data) else {
        return;
    };

    if let Some(level) = status.current_level {
        if let Some(sink) = shared.sinks.borrow_mut().fan_level.as_deref_mut() {
            sink.publish(level);
        }
    }
}

async fn update_faults<P: SerialPort>(shared: &Shared<P>) {
    let response = match shared.engine.query_data(CMD_GET_FAULTS, FAULTS_LEN).await {
        Ok(response) => response,
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("failed to get faults: {}", _err);
            return;
        }
    };

    let Ok(report) = FaultReport::parse(&response.data) else {
        return;
    };

    #[cfg(feature = "defmt")]
    defmt::debug!(
        "faults: A {=u8:x} E {=u8:x} EA {=u8:x} A(high) {=u8:x}",
        report.fault_a,
        report.fault_e,
        report.fault_ea,
        report.fault_a_high
    );

    let mut sinks = shared.sinks.borrow_mut();
    if let Some(sink) = sinks.filter_full.as_deref_mut() {
        sink.publish(report.filter_full);
    }
    if let Some(sink) = sinks.faults.as_deref_mut() {
        sink.publish(&report);
    }
}

async fn update_bypass_control<P: SerialPort>(shared: &Shared<P>) {
    match shared
        .engine
        .query_data(CMD_GET_BYPASS_CONTROL, BYPASS_CONTROL_LEN)
        .await
    {
        Ok(_response) => {
            #[cfg(feature = "defmt")]
            defmt::debug!("bypass control status: {=[u8]:x}", &_response.data[..]);
        }
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("failed to get bypass control status: {}", _err);
        }
    }
}

async fn apply_level<P: SerialPort>(shared: &Shared<P>, level: u8) {
    let raw = level_to_raw(level);
    if let Err(_err) = shared.engine.send_command(CMD_SET_LEVEL, &[raw]).await {
        #[cfg(feature = "defmt")]
        defmt::warn!("failed to apply level {}: {}", level, _err);
    }
}

async fn apply_comfort_temperature<P: SerialPort>(shared: &Shared<P>, celsius_x10: i16) {
    let raw = celsius_x10_to_raw(celsius_x10);
    if let Err(_err) = shared
        .engine
        .send_command(CMD_SET_COMFORT_TEMPERATURE, &[raw])
        .await
    {
        #[cfg(feature = "defmt")]
        defmt::warn!("failed to apply comfort temperature: {}", _err);
    }
}
