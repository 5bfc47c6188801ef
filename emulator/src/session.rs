use std::io::{self, ErrorKind, Write};
use std::rc::Rc;

use flight_core::boot::{BootReport, boot};
use flight_core::config::FlightConfig;
use flight_core::crash::BootCheck;
use flight_core::lifecycle::{FlightController, Step};
use flight_core::status::HealthLine;
use flight_core::telemetry::{EventId, TelemetryPayload};

use crate::sim::{GroundCapture, GroundLines, ImageStorage, SimInstant, SimModem, SimSensors};
use crate::transcript::{TranscriptLogger, TranscriptRole};

type SimController = FlightController<SimModem, SimSensors, GroundCapture, SimInstant>;

/// How the session ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Completed { cycles: u32 },
    /// Tick budget ran out first, typically a modem that never acquires.
    TickBudgetExhausted { cycles: u32 },
}

/// One emulated power-on: boot followed by duty cycles on a simulated clock.
pub struct Session<W: Write> {
    controller: SimController,
    storage: ImageStorage,
    ground: GroundLines,
    transcript: TranscriptLogger<W>,
    now: SimInstant,
    cursor: EventId,
}

impl<W: Write> Session<W> {
    pub fn boot(
        config: FlightConfig,
        mut storage: ImageStorage,
        modem: SimModem,
        transcript: TranscriptLogger<W>,
    ) -> io::Result<Self> {
        let ground = GroundLines::default();
        let debug = GroundCapture::new(Rc::clone(&ground));
        let (controller, report) = boot(
            config,
            &mut storage,
            modem,
            SimSensors::default(),
            Some(debug),
            SimInstant::BOOT,
        )
        .map_err(|error| io::Error::new(ErrorKind::InvalidInput, error.to_string()))?;
        storage.take_error()?;

        let mut session = Self {
            controller,
            storage,
            ground,
            transcript,
            now: SimInstant::BOOT,
            cursor: 0,
        };
        session.flush()?;
        session.log_boot(&report)?;
        Ok(session)
    }

    /// Ticks until `cycles` duty cycles complete or `tick_budget` ticks elapse.
    pub fn run(&mut self, cycles: u32, tick_budget: u64) -> io::Result<Outcome> {
        let mut ticks = 0u64;
        while self.cycles_completed() < cycles {
            if ticks >= tick_budget {
                let completed = self.cycles_completed();
                self.emulator_line(&format!(
                    "stopping after {ticks} ticks with {completed} of {cycles} cycles complete"
                ))?;
                return Ok(Outcome::TickBudgetExhausted { cycles: completed });
            }
            self.step()?;
            ticks += 1;
        }

        let sessions = self.modem_sessions();
        self.emulator_line(&format!(
            "completed {cycles} cycles, {sessions} modem sessions"
        ))?;
        Ok(Outcome::Completed { cycles })
    }

    pub fn cycles_completed(&self) -> u32 {
        self.controller.context().cycles_completed()
    }

    pub fn modem_sessions(&self) -> u32 {
        self.controller.comms().sessions()
    }

    pub fn storage(&self) -> &ImageStorage {
        &self.storage
    }

    pub fn transcript(&self) -> &TranscriptLogger<W> {
        &self.transcript
    }

    fn step(&mut self) -> io::Result<()> {
        let step = self.controller.tick(self.now);
        self.flush()?;
        if let Step::Advanced(transition) = step {
            let line = format!(
                "{} -> {} (next tick in {:.3} s)",
                transition.from,
                transition.to,
                transition.wait.as_secs_f64()
            );
            self.transcript
                .append_line(self.now.since_boot(), TranscriptRole::Flight, &line)?;
        }
        self.now = self.now + step.wait();
        Ok(())
    }

    /// Transcribes queued ground lines, then telemetry recorded since the last flush.
    fn flush(&mut self) -> io::Result<()> {
        let elapsed = self.now.since_boot();
        while let Some(line) = self.ground.borrow_mut().pop_front() {
            self.transcript
                .append_line(elapsed, TranscriptRole::Ground, &line)?;
        }

        let telemetry = self.controller.telemetry();
        for record in telemetry.since(self.cursor) {
            let line = match record.details {
                TelemetryPayload::None => format!("#{} {}", record.id, record.event),
                details => format!("#{} {} {details:?}", record.id, record.event),
            };
            self.transcript.append_line(
                record.timestamp.since_boot(),
                TranscriptRole::Telemetry,
                &line,
            )?;
        }
        self.cursor = telemetry.next_event_id();
        Ok(())
    }

    fn log_boot(&mut self, report: &BootReport) -> io::Result<()> {
        let crash = match report.crash {
            BootCheck::Armed => "crash flag armed",
            BootCheck::DirtyRestart { .. } => "dirty restart detected, recovery not implemented",
            BootCheck::Skipped => "crash flag not handled",
        };
        let line = format!(
            "boot {} build: {crash}, health {}",
            self.controller.config().variant.tag(),
            HealthLine(report.health)
        );
        self.transcript
            .append_line(self.now.since_boot(), TranscriptRole::Flight, &line)
    }

    fn emulator_line(&mut self, line: &str) -> io::Result<()> {
        self.transcript
            .append_line(self.now.since_boot(), TranscriptRole::Emulator, line)
    }
}
