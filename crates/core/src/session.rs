use gsp_protocol::{Cid, CommandLog, Envelope, Oid, wire};

use crate::error::ProtocolError;
use crate::object::ObjectHandle;
use crate::registry::Registry;

/// Monotonic identifier source, starting from 1, never reused within a
/// session lifetime. The counter is 64 bits wide; wrapping is not a
/// practical concern.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 1;
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Which side of the protocol a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Produces envelopes: record, emit, and track by default.
    Client,
    /// Replays envelopes: nothing recorded or emitted by default.
    /// Replayer registrations bypass the tracking switch.
    Server,
}

/// Per-session switches, seeded from the mode and overridable both at
/// mode-switch time and per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Append produced envelopes to the command log.
    pub record: bool,
    /// Emit serialized envelopes through the output sink.
    pub output: bool,
    /// Run declared-type validation before each wrapped call.
    pub check: bool,
    /// Retain newly constructed objects in the registry. Only affects
    /// recorder-side constructions; the replayer always registers.
    pub track: bool,
}

impl Settings {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Client => Self {
                record: true,
                output: true,
                check: true,
                track: true,
            },
            Mode::Server => Self {
                record: false,
                output: false,
                check: false,
                track: false,
            },
        }
    }
}

/// Options for a mode switch.
#[derive(Debug, Clone, Copy)]
pub struct ModeOptions {
    /// Clear the registry and restart the allocators. The command log
    /// is left intact so a recorded log survives switching the same
    /// session over to replay.
    pub reset: bool,
    pub record: Option<bool>,
    pub output: Option<bool>,
    pub check: Option<bool>,
}

impl Default for ModeOptions {
    fn default() -> Self {
        Self {
            reset: true,
            record: None,
            output: None,
            check: None,
        }
    }
}

type OutputSink = Box<dyn FnMut(&str) + Send>;

/// One independent protocol context: identifier allocators, object
/// registry, command log, and mode settings. Everything the reference
/// design kept process-wide lives here, so a process can run any number
/// of sessions side by side.
pub struct Session {
    mode: Mode,
    settings: Settings,
    oids: IdAllocator,
    cids: IdAllocator,
    registry: Registry,
    log: CommandLog,
    sink: Option<OutputSink>,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            settings: Settings::for_mode(mode),
            oids: IdAllocator::new(),
            cids: IdAllocator::new(),
            registry: Registry::new(),
            log: CommandLog::new(),
            sink: None,
        }
    }

    /// A recording session with client defaults.
    pub fn client() -> Self {
        Self::new(Mode::Client)
    }

    /// A replaying session with server defaults.
    pub fn server() -> Self {
        Self::new(Mode::Server)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Switch modes, applying defaults and any overrides.
    pub fn set_mode(&mut self, mode: Mode, options: ModeOptions) {
        if options.reset {
            self.reset();
        }
        self.mode = mode;
        let mut settings = Settings::for_mode(mode);
        if let Some(record) = options.record {
            settings.record = record;
        }
        if let Some(output) = options.output {
            settings.output = output;
        }
        if let Some(check) = options.check {
            settings.check = check;
        }
        self.settings = settings;
    }

    /// Clear the registry and restart both allocators. Ids issued
    /// before the reset resolve to nothing afterwards; the log
    /// survives.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.oids.reset();
        self.cids.reset();
    }

    /// Install the destination for emitted envelopes. Without a sink,
    /// emitted envelopes go to the `log` facade at debug level.
    pub fn set_output_sink(&mut self, sink: OutputSink) {
        self.sink = Some(sink);
    }

    pub fn clear_output_sink(&mut self) {
        self.sink = None;
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    /// Hand the recorded log over (for transport) and start a new one.
    pub fn take_log(&mut self) -> CommandLog {
        std::mem::take(&mut self.log)
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Register an object under an identifier chosen by the caller.
    /// This is the replayer's path; it bypasses the tracking switch so
    /// the replayed graph is always reachable.
    pub fn adopt(&mut self, oid: Oid, handle: ObjectHandle) -> Result<(), ProtocolError> {
        self.registry.insert(oid, handle)
    }

    pub(crate) fn allocate_oid(&mut self) -> Oid {
        Oid::new(self.oids.allocate())
    }

    pub(crate) fn allocate_cid(&mut self) -> Cid {
        Cid::new(self.cids.allocate())
    }

    pub(crate) fn track(&mut self, oid: Oid, handle: ObjectHandle) -> Result<(), ProtocolError> {
        if self.settings.track {
            self.registry.insert(oid, handle)?;
        }
        Ok(())
    }

    pub(crate) fn append(&mut self, envelope: Envelope) {
        self.log.push(envelope);
    }

    pub(crate) fn emit(&mut self, envelope: &Envelope) {
        match wire::envelope_to_json(envelope) {
            Ok(text) => match &mut self.sink {
                Some(sink) => sink(&text),
                None => log::debug!("command: {text}"),
            },
            Err(err) => log::warn!("could not serialize envelope for output: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic_from_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), 1);
        assert_eq!(ids.allocate(), 2);
        assert_eq!(ids.allocate(), 3);
        ids.reset();
        assert_eq!(ids.allocate(), 1);
    }

    #[test]
    fn session_allocators_are_independent() {
        let mut session = Session::client();
        assert_eq!(session.allocate_oid(), Oid::new(1));
        assert_eq!(session.allocate_oid(), Oid::new(2));
        assert_eq!(session.allocate_cid(), Cid::new(1));
    }

    #[test]
    fn mode_defaults() {
        let client = Session::client();
        assert_eq!(
            client.settings(),
            Settings {
                record: true,
                output: true,
                check: true,
                track: true
            }
        );

        let server = Session::server();
        assert_eq!(
            server.settings(),
            Settings {
                record: false,
                output: false,
                check: false,
                track: false
            }
        );
    }

    #[test]
    fn mode_switch_applies_overrides() {
        let mut session = Session::client();
        session.set_mode(
            Mode::Client,
            ModeOptions {
                output: Some(false),
                ..ModeOptions::default()
            },
        );
        assert!(session.settings().record);
        assert!(!session.settings().output);
    }

    #[test]
    fn reset_restarts_allocators_and_keeps_log() {
        let mut session = Session::client();
        session.allocate_oid();
        session.allocate_oid();
        let cid = session.allocate_cid();
        session.append(Envelope::new(
            gsp_protocol::Method::construct("Canvas"),
            cid,
            gsp_protocol::Params::new(),
        ));

        session.set_mode(Mode::Server, ModeOptions::default());
        assert!(session.registry().is_empty());
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.allocate_oid(), Oid::new(1));
    }
}
